//! Wrappers that record rate-limit observations while unwrapping upstream
//! client results into `anyhow` errors for the retry policy.

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use discogs_client::{DiscogsError, Observed};
use genius_client::GeniusError;
use spotify_client::SpotifyError;
use tracing::warn;

use crate::kernel::PipelineDeps;

/// Unwrap a Spotify result. A 429 writes an exhausted counter (Spotify only
/// exposes Retry-After) before surfacing the error.
pub(crate) async fn observe_spotify<T>(
    deps: &PipelineDeps,
    endpoint: &str,
    result: spotify_client::Result<T>,
) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(SpotifyError::RateLimited { retry_after_secs }) => {
            let reset_at = Utc::now() + Duration::seconds(retry_after_secs as i64);
            if let Err(e) = deps
                .gate
                .update("spotify", endpoint, 0, 0, Some(reset_at), None)
                .await
            {
                warn!(endpoint, error = %e, "failed to record spotify rate limit");
            }
            Err(anyhow!(
                "spotify rate limited on {}, retry after {}s",
                endpoint,
                retry_after_secs
            ))
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn observe_genius<T>(
    deps: &PipelineDeps,
    endpoint: &str,
    result: genius_client::Result<T>,
) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(GeniusError::RateLimited { retry_after_secs }) => {
            let reset_at = Utc::now() + Duration::seconds(retry_after_secs as i64);
            if let Err(e) = deps
                .gate
                .update("genius", endpoint, 0, 0, Some(reset_at), None)
                .await
            {
                warn!(endpoint, error = %e, "failed to record genius rate limit");
            }
            Err(anyhow!(
                "genius rate limited on {}, retry after {}s",
                endpoint,
                retry_after_secs
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Unwrap a Discogs result, feeding the `X-Discogs-Ratelimit*` counters
/// observed on the response back through the gate.
pub(crate) async fn observe_discogs<T>(
    deps: &PipelineDeps,
    endpoint: &str,
    result: discogs_client::Result<Observed<T>>,
) -> Result<T> {
    match result {
        Ok(observed) => {
            if let Some(info) = &observed.rate_limit {
                if let Err(e) = deps
                    .gate
                    .update(
                        "discogs",
                        endpoint,
                        info.remaining,
                        info.limit,
                        Some(info.reset_at),
                        None,
                    )
                    .await
                {
                    warn!(endpoint, error = %e, "failed to record discogs rate limit");
                }
            }
            Ok(observed.data)
        }
        Err(DiscogsError::RateLimited { retry_after_secs }) => {
            let reset_at = Utc::now() + Duration::seconds(retry_after_secs as i64);
            if let Err(e) = deps
                .gate
                .update("discogs", endpoint, 0, 0, Some(reset_at), None)
                .await
            {
                warn!(endpoint, error = %e, "failed to record discogs rate limit");
            }
            Err(anyhow!(
                "discogs rate limited on {}, retry after {}s",
                endpoint,
                retry_after_secs
            ))
        }
        Err(e) => Err(e.into()),
    }
}
