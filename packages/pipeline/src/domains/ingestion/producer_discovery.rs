//! Producer enrichment: cross-reference one track against Genius and
//! Discogs and record the credited producers.

use anyhow::{anyhow, bail, Result};
use tracing::info;

use super::payloads::ProducerDiscoveryPayload;
use super::upstream::{observe_discogs, observe_genius};
use crate::domains::catalog::{normalize_producer_name, Producer, Track};
use crate::kernel::PipelineDeps;

/// A credit pulled from one source, pre-normalization.
struct CreditCandidate {
    name: String,
    genius_id: Option<i64>,
    discogs_id: Option<i64>,
    source: &'static str,
}

pub async fn run(payload: ProducerDiscoveryPayload, deps: &PipelineDeps) -> Result<()> {
    // The track page committed this row before enqueueing us.
    let track = Track::find_by_spotify_id(&deps.db_pool, &payload.track_id)
        .await?
        .ok_or_else(|| anyhow!("track {} not in catalog", payload.track_id))?;

    let mut candidates = Vec::new();

    // Genius: search, then pull the song's producer credits.
    if !deps.gate.check("genius", "search", &deps.shutdown).await? {
        bail!("cancelled while waiting on genius rate limit");
    }
    let query = format!("{} {}", payload.track_name, payload.artist_name);
    let hits = observe_genius(deps, "search", deps.genius.search(&query).await).await?;
    if let Some(hit) = hits.first() {
        let song =
            observe_genius(deps, "songs", deps.genius.song(hit.result.id).await).await?;
        for producer in song.producer_artists {
            candidates.push(CreditCandidate {
                name: producer.name,
                genius_id: Some(producer.id),
                discogs_id: None,
                source: "genius",
            });
        }
    }

    // Discogs: search the release, then read the credit list.
    if !deps.gate.check("discogs", "search", &deps.shutdown).await? {
        bail!("cancelled while waiting on discogs rate limit");
    }
    let results = observe_discogs(
        deps,
        "search",
        deps.discogs
            .search_release(&payload.artist_name, &payload.track_name)
            .await,
    )
    .await?;
    if let Some(result) = results.first() {
        let release =
            observe_discogs(deps, "releases", deps.discogs.release(result.id).await).await?;
        for credit in release.extraartists {
            if credit.role.to_lowercase().contains("producer") {
                candidates.push(CreditCandidate {
                    name: credit.name,
                    genius_id: None,
                    discogs_id: credit.id,
                    source: "discogs",
                });
            }
        }
    }

    let mut linked = 0;
    for candidate in candidates {
        if normalize_producer_name(&candidate.name).is_empty() {
            continue;
        }
        let producer = Producer::upsert(
            &deps.db_pool,
            &candidate.name,
            candidate.genius_id,
            candidate.discogs_id,
        )
        .await?;
        Producer::link_track(&deps.db_pool, track.id, producer.id, candidate.source).await?;
        linked += 1;
    }

    info!(
        track_id = %payload.track_id,
        track = %payload.track_name,
        credits = linked,
        "producer discovery complete"
    );

    Ok(())
}
