//! Shared dependency container handed to every handler.
//!
//! Constructed once at startup and injected into the worker, monitor, and
//! HTTP surface. No ambient singletons; handlers only ever see this struct.

use std::sync::Arc;

use discogs_client::DiscogsClient;
use genius_client::GeniusClient;
use spotify_client::SpotifyClient;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use super::batches::RateLimitGate;

#[derive(Clone)]
pub struct PipelineDeps {
    pub db_pool: PgPool,
    pub spotify: Arc<SpotifyClient>,
    pub genius: Arc<GeniusClient>,
    pub discogs: Arc<DiscogsClient>,
    /// Cooperative rate-limit gate consulted before upstream calls.
    pub gate: RateLimitGate,
    /// Cancelled on shutdown; the gate's wait respects it.
    pub shutdown: CancellationToken,
}

impl PipelineDeps {
    pub fn new(
        db_pool: PgPool,
        spotify: Arc<SpotifyClient>,
        genius: Arc<GeniusClient>,
        discogs: Arc<DiscogsClient>,
    ) -> Self {
        let gate = RateLimitGate::new(db_pool.clone());
        Self {
            db_pool,
            spotify,
            genius,
            discogs,
            gate,
            shutdown: CancellationToken::new(),
        }
    }

    /// Dependencies with placeholder upstream credentials, for tests whose
    /// handlers never reach the network.
    pub fn for_tests(db_pool: PgPool) -> Self {
        Self::new(
            db_pool,
            Arc::new(SpotifyClient::new("test-id".into(), "test-secret".into())),
            Arc::new(GeniusClient::new("test-token".into())),
            Arc::new(DiscogsClient::new("test-key".into(), "test-secret".into())),
        )
    }
}
