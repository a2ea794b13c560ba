//! Discovery seed job: find artists worth ingesting and fan out one
//! `album_page` batch per artist.

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::payloads::{AlbumPagePayload, DiscoverArtistsPayload, PAGE_LIMIT};
use super::upstream::observe_spotify;
use crate::domains::catalog::Artist;
use crate::kernel::batches::Batch;
use crate::kernel::PipelineDeps;

/// Genre seeds sampled per untargeted discovery run.
const SEED_GENRE_COUNT: usize = 5;
/// Artists fetched per genre seed.
const SEED_SEARCH_LIMIT: u32 = 5;
/// Default limit for targeted queries without an explicit one.
const DEFAULT_SEARCH_LIMIT: u32 = 20;
/// Pause between consecutive seed searches.
const SEED_CALL_DELAY_MS: u64 = 250;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiscoveryOutcome {
    pub artists_found: usize,
    pub batches_enqueued: usize,
}

pub async fn run(
    payload: DiscoverArtistsPayload,
    deps: &PipelineDeps,
) -> Result<DiscoveryOutcome> {
    if !deps.gate.check("spotify", "search", &deps.shutdown).await? {
        bail!("cancelled while waiting on spotify search rate limit");
    }

    let artists = match &payload.query {
        Some(query) => {
            let limit = payload
                .limit
                .as_deref()
                .and_then(|l| l.parse().ok())
                .unwrap_or(DEFAULT_SEARCH_LIMIT);
            observe_spotify(deps, "search", deps.spotify.search_artists(query, limit).await)
                .await?
        }
        None => {
            let seeds =
                observe_spotify(deps, "search", deps.spotify.genre_seeds().await).await?;

            let mut found = Vec::new();
            for (i, genre) in seeds.iter().take(SEED_GENRE_COUNT).enumerate() {
                if i > 0 {
                    tokio::time::sleep(Duration::from_millis(SEED_CALL_DELAY_MS)).await;
                }
                let query = format!("genre:\"{}\"", genre);
                let artists = observe_spotify(
                    deps,
                    "search",
                    deps.spotify.search_artists(&query, SEED_SEARCH_LIMIT).await,
                )
                .await?;
                found.extend(artists);
            }
            found
        }
    };

    let mut batches_enqueued = 0;
    for artist in &artists {
        Artist::upsert(
            &deps.db_pool,
            &artist.id,
            &artist.name,
            &artist.genres,
            artist.popularity,
        )
        .await?;

        let page = AlbumPagePayload {
            artist_id: artist.id.clone(),
            offset: 0,
            limit: PAGE_LIMIT,
        };
        if Batch::enqueue_payload(&deps.db_pool, &page).await?.is_created() {
            batches_enqueued += 1;
        }
    }

    let outcome = DiscoveryOutcome {
        artists_found: artists.len(),
        batches_enqueued,
    };
    info!(
        artists_found = outcome.artists_found,
        batches_enqueued = outcome.batches_enqueued,
        "artist discovery complete"
    );

    Ok(outcome)
}
