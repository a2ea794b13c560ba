//! One page of an album's tracks: upsert them and fan out one
//! `producer_discovery` batch per track.

use anyhow::{anyhow, bail, Result};
use tracing::info;

use super::payloads::{ProducerDiscoveryPayload, TrackPagePayload};
use super::upstream::observe_spotify;
use crate::domains::catalog::{Album, Artist, Track};
use crate::kernel::batches::Batch;
use crate::kernel::PipelineDeps;

pub async fn run(payload: TrackPagePayload, deps: &PipelineDeps) -> Result<()> {
    if !deps
        .gate
        .check("spotify", "album_tracks", &deps.shutdown)
        .await?
    {
        bail!("cancelled while waiting on spotify album_tracks rate limit");
    }

    let album = Album::find_by_spotify_id(&deps.db_pool, &payload.album_id)
        .await?
        .ok_or_else(|| anyhow!("album {} not in catalog", payload.album_id))?;
    let artist = Artist::find_by_id(&deps.db_pool, album.artist_id).await?;

    let page = observe_spotify(
        deps,
        "album_tracks",
        deps.spotify
            .album_tracks(&payload.album_id, payload.offset, payload.limit)
            .await,
    )
    .await?;

    for track in &page.items {
        Track::upsert(
            &deps.db_pool,
            &track.id,
            album.id,
            &track.name,
            track.disc_number,
            track.track_number,
            track.duration_ms,
        )
        .await?;

        Batch::enqueue_payload(
            &deps.db_pool,
            &ProducerDiscoveryPayload {
                track_id: track.id.clone(),
                track_name: track.name.clone(),
                artist_name: artist.name.clone(),
            },
        )
        .await?;
    }

    if page.has_next() {
        Batch::enqueue_payload(
            &deps.db_pool,
            &TrackPagePayload {
                album_id: payload.album_id.clone(),
                offset: payload.offset + payload.limit,
                limit: payload.limit,
            },
        )
        .await?;
    }

    info!(
        album_id = %payload.album_id,
        offset = payload.offset,
        tracks = page.items.len(),
        has_next = page.has_next(),
        "track page processed"
    );

    Ok(())
}
