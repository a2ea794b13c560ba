//! Ingestion handlers: the chained job kinds that walk an artist's
//! discography across Spotify, Genius, and Discogs.
//!
//! ```text
//! discover-artists ──► album_page ──► track_page ──► producer_discovery
//! ```
//!
//! Each handler upserts its rows first and only then enqueues child
//! batches, so a child never observes missing parents. Handlers never
//! touch batch status; the dispatcher owns the lifecycle.

pub mod album_page;
pub mod discover_artists;
pub mod payloads;
pub mod producer_discovery;
pub mod track_page;
mod upstream;

pub use payloads::{
    AlbumPagePayload, DiscoverArtistsPayload, ProducerDiscoveryPayload, TrackPagePayload,
};

use crate::kernel::batches::{BatchPayload, HandlerRegistry};

/// Register every ingestion handler and its batch-type aliases.
pub fn register_handlers(registry: &mut HandlerRegistry) {
    registry.register::<DiscoverArtistsPayload, _, _>(
        DiscoverArtistsPayload::BATCH_TYPE,
        |payload, deps| async move { discover_artists::run(payload, &deps).await.map(|_| ()) },
    );
    registry.register::<AlbumPagePayload, _, _>(
        AlbumPagePayload::BATCH_TYPE,
        |payload, deps| async move { album_page::run(payload, &deps).await },
    );
    registry.register::<TrackPagePayload, _, _>(
        TrackPagePayload::BATCH_TYPE,
        |payload, deps| async move { track_page::run(payload, &deps).await },
    );
    registry.register::<ProducerDiscoveryPayload, _, _>(
        ProducerDiscoveryPayload::BATCH_TYPE,
        |payload, deps| async move { producer_discovery::run(payload, &deps).await },
    );

    // Legacy type names still emitted by older seed tooling.
    registry.alias("album_discovery", "album_page");
    registry.alias("track_discovery", "track_page");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pipeline_types_are_registered() {
        let mut registry = HandlerRegistry::new();
        register_handlers(&mut registry);

        for batch_type in [
            "discover-artists",
            "album_page",
            "track_page",
            "producer_discovery",
            "album_discovery",
            "track_discovery",
        ] {
            assert!(registry.is_registered(batch_type), "{batch_type} missing");
        }
    }
}
