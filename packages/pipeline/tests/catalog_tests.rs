//! Integration tests for the catalog upserts that make handler
//! re-execution safe.

mod common;

use common::TestHarness;
use pipeline_core::domains::catalog::{Album, Artist, Producer, Track};

#[tokio::test]
async fn artist_upsert_converges_on_spotify_id() {
    let ctx = TestHarness::new().await;

    let first = Artist::upsert(&ctx.db_pool, "sp-1", "Radiohead", &[], None)
        .await
        .expect("upsert");
    let second = Artist::upsert(
        &ctx.db_pool,
        "sp-1",
        "Radiohead",
        &["art rock".to_string()],
        Some(90),
    )
    .await
    .expect("upsert");

    assert_eq!(first.id, second.id);
    assert_eq!(second.genres, vec!["art rock".to_string()]);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM artists")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    assert_eq!(total, 1);
}

#[tokio::test]
async fn album_and_track_upserts_are_idempotent() {
    let ctx = TestHarness::new().await;
    let artist = Artist::upsert(&ctx.db_pool, "sp-1", "Radiohead", &[], None)
        .await
        .expect("artist");

    for _ in 0..2 {
        let album = Album::upsert(
            &ctx.db_pool,
            "al-1",
            artist.id,
            "OK Computer",
            "album",
            Some("1997-05-21"),
            Some(12),
        )
        .await
        .expect("album");
        Track::upsert(&ctx.db_pool, "tr-1", album.id, "Airbag", 1, 1, 284_000)
            .await
            .expect("track");
    }

    let albums = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM albums")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    let tracks = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tracks")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    assert_eq!(albums, 1);
    assert_eq!(tracks, 1);
}

#[tokio::test]
async fn producer_upsert_merges_source_ids_across_casings() {
    let ctx = TestHarness::new().await;

    let from_genius = Producer::upsert(&ctx.db_pool, "Rick Rubin", Some(42), None)
        .await
        .expect("upsert");
    let from_discogs = Producer::upsert(&ctx.db_pool, "RICK RUBIN", None, Some(7))
        .await
        .expect("upsert");

    assert_eq!(from_genius.id, from_discogs.id);
    assert_eq!(from_discogs.genius_id, Some(42));
    assert_eq!(from_discogs.discogs_id, Some(7));
    // The first-seen display name wins.
    assert_eq!(from_discogs.name, "Rick Rubin");
}

#[tokio::test]
async fn track_producer_links_are_idempotent_per_source() {
    let ctx = TestHarness::new().await;
    let artist = Artist::upsert(&ctx.db_pool, "sp-1", "Run The Jewels", &[], None)
        .await
        .expect("artist");
    let album = Album::upsert(&ctx.db_pool, "al-1", artist.id, "RTJ4", "album", None, None)
        .await
        .expect("album");
    let track = Track::upsert(&ctx.db_pool, "tr-1", album.id, "ooh la la", 1, 4, 221_000)
        .await
        .expect("track");
    let producer = Producer::upsert(&ctx.db_pool, "El-P", None, None)
        .await
        .expect("producer");

    for _ in 0..2 {
        Producer::link_track(&ctx.db_pool, track.id, producer.id, "genius")
            .await
            .expect("link");
    }
    Producer::link_track(&ctx.db_pool, track.id, producer.id, "discogs")
        .await
        .expect("link");

    let credited = Producer::for_track(&ctx.db_pool, track.id)
        .await
        .expect("for_track");
    assert_eq!(credited.len(), 1);

    let links = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM track_producers")
        .fetch_one(&ctx.db_pool)
        .await
        .expect("count");
    assert_eq!(links, 2);
}
