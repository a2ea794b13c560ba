//! Music catalog: artists, albums, tracks, and producer credits.
//!
//! Every write is an upsert on a natural key (Spotify IDs, normalized
//! producer names), so re-running a handler on the same payload converges
//! to the same state.

pub mod models;
mod normalize;

pub use models::{Album, Artist, Producer, Track};
pub use normalize::normalize_producer_name;
