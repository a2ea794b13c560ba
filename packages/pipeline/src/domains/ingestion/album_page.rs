//! One page of an artist's discography: upsert the albums, fan out a
//! `track_page` batch per album, chain the next page while more remain.

use anyhow::{anyhow, bail, Result};
use tracing::info;

use super::payloads::{AlbumPagePayload, TrackPagePayload, PAGE_LIMIT};
use super::upstream::observe_spotify;
use crate::domains::catalog::{Album, Artist};
use crate::kernel::batches::Batch;
use crate::kernel::PipelineDeps;

pub async fn run(payload: AlbumPagePayload, deps: &PipelineDeps) -> Result<()> {
    if !deps
        .gate
        .check("spotify", "artist_albums", &deps.shutdown)
        .await?
    {
        bail!("cancelled while waiting on spotify artist_albums rate limit");
    }

    // Discovery committed the artist before enqueueing this page.
    let artist = Artist::find_by_spotify_id(&deps.db_pool, &payload.artist_id)
        .await?
        .ok_or_else(|| anyhow!("artist {} not in catalog", payload.artist_id))?;

    let page = observe_spotify(
        deps,
        "artist_albums",
        deps.spotify
            .artist_albums(&payload.artist_id, payload.offset, payload.limit)
            .await,
    )
    .await?;

    for album in &page.items {
        Album::upsert(
            &deps.db_pool,
            &album.id,
            artist.id,
            &album.name,
            &album.album_type,
            album.release_date.as_deref(),
            album.total_tracks,
        )
        .await?;

        Batch::enqueue_payload(
            &deps.db_pool,
            &TrackPagePayload {
                album_id: album.id.clone(),
                offset: 0,
                limit: PAGE_LIMIT,
            },
        )
        .await?;
    }

    if page.has_next() {
        Batch::enqueue_payload(
            &deps.db_pool,
            &AlbumPagePayload {
                artist_id: payload.artist_id.clone(),
                offset: payload.offset + payload.limit,
                limit: payload.limit,
            },
        )
        .await?;
    }

    info!(
        artist_id = %payload.artist_id,
        offset = payload.offset,
        albums = page.items.len(),
        has_next = page.has_next(),
        "album page processed"
    );

    Ok(())
}
