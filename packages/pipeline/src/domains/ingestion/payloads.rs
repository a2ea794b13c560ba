//! Typed batch payloads for the ingestion job kinds.
//!
//! These are the concrete variants of the engine's opaque `metadata`
//! column; the registry deserializes them back when dispatching.

use serde::{Deserialize, Serialize};

use crate::kernel::batches::BatchPayload;

/// Page size used when chaining album and track pages.
pub const PAGE_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverArtistsPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Kept as a string to match the invocation surface contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

impl BatchPayload for DiscoverArtistsPayload {
    const BATCH_TYPE: &'static str = "discover-artists";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumPagePayload {
    pub artist_id: String,
    pub offset: u32,
    pub limit: u32,
}

impl BatchPayload for AlbumPagePayload {
    const BATCH_TYPE: &'static str = "album_page";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPagePayload {
    pub album_id: String,
    pub offset: u32,
    pub limit: u32,
}

impl BatchPayload for TrackPagePayload {
    const BATCH_TYPE: &'static str = "track_page";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerDiscoveryPayload {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
}

impl BatchPayload for ProducerDiscoveryPayload {
    const BATCH_TYPE: &'static str = "producer_discovery";
}
