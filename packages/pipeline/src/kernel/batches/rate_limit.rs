//! Per (api, endpoint) rate-limit counters and the cooperative gate
//! consulted before outbound calls.
//!
//! The gate is advisory: two workers can both read `remaining = 1` and
//! proceed. Upstream APIs return 429 and fresh headers, so the counters
//! converge.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::batch::CLAIM_LEASE_MINUTES;

#[derive(FromRow, Debug, Clone, Serialize)]
pub struct RateLimit {
    pub api_name: String,
    pub endpoint: String,
    pub requests_remaining: i32,
    pub requests_limit: i32,
    pub reset_at: Option<DateTime<Utc>>,
    pub last_response: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl RateLimit {
    pub async fn find(pool: &PgPool, api_name: &str, endpoint: &str) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            SELECT api_name, endpoint, requests_remaining, requests_limit,
                   reset_at, last_response, updated_at
            FROM rate_limits
            WHERE api_name = $1 AND endpoint = $2
            "#,
        )
        .bind(api_name)
        .bind(endpoint)
        .fetch_optional(pool)
        .await?;

        Ok(row)
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, Self>(
            r#"
            SELECT api_name, endpoint, requests_remaining, requests_limit,
                   reset_at, last_response, updated_at
            FROM rate_limits
            ORDER BY api_name, endpoint
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(rows)
    }

    /// Upsert the counters observed on an API response.
    pub async fn track(
        pool: &PgPool,
        api_name: &str,
        endpoint: &str,
        remaining: i32,
        limit: i32,
        reset_at: Option<DateTime<Utc>>,
        last_response: Option<serde_json::Value>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_limits (api_name, endpoint, requests_remaining, requests_limit,
                                     reset_at, last_response, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (api_name, endpoint) DO UPDATE SET
                requests_remaining = EXCLUDED.requests_remaining,
                requests_limit = EXCLUDED.requests_limit,
                reset_at = EXCLUDED.reset_at,
                last_response = EXCLUDED.last_response,
                updated_at = NOW()
            "#,
        )
        .bind(api_name)
        .bind(endpoint)
        .bind(remaining)
        .bind(limit)
        .bind(reset_at)
        .bind(last_response)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Remaining budget as a percentage of the limit. A zero limit reads as
    /// fully available (untracked).
    pub fn remaining_percent(&self) -> f64 {
        if self.requests_limit <= 0 {
            return 100.0;
        }
        (self.requests_remaining as f64 / self.requests_limit as f64) * 100.0
    }
}

/// Cooperative token gate over the `rate_limits` table.
#[derive(Clone)]
pub struct RateLimitGate {
    pool: PgPool,
}

impl RateLimitGate {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether a call to `(api, endpoint)` may proceed.
    ///
    /// Exhausted counters block until `reset_at`, capped at one claim lease
    /// so a stale row cannot park a worker past its own lease. Returns
    /// `false` only when cancelled mid-wait.
    pub async fn check(
        &self,
        api_name: &str,
        endpoint: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let row = match RateLimit::find(&self.pool, api_name, endpoint).await? {
            // No row means the API is untracked so far.
            None => return Ok(true),
            Some(row) => row,
        };

        if row.requests_remaining > 0 {
            return Ok(true);
        }

        let reset_at = match row.reset_at {
            Some(reset_at) if reset_at > Utc::now() => reset_at,
            // Window already rolled over.
            _ => return Ok(true),
        };

        let until_reset = (reset_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let cap = Duration::from_secs(CLAIM_LEASE_MINUTES as u64 * 60);
        let wait = until_reset.min(cap);

        tracing::info!(
            api_name,
            endpoint,
            wait_secs = wait.as_secs(),
            "rate limit exhausted, waiting for reset"
        );

        tokio::select! {
            _ = cancel.cancelled() => Ok(false),
            _ = tokio::time::sleep(wait) => Ok(true),
        }
    }

    /// Record counters observed on an API response.
    #[allow(clippy::too_many_arguments)]
    pub async fn update(
        &self,
        api_name: &str,
        endpoint: &str,
        remaining: i32,
        limit: i32,
        reset_at: Option<DateTime<Utc>>,
        last_response: Option<serde_json::Value>,
    ) -> Result<()> {
        RateLimit::track(
            &self.pool, api_name, endpoint, remaining, limit, reset_at, last_response,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limit_row(remaining: i32, limit: i32) -> RateLimit {
        RateLimit {
            api_name: "spotify".into(),
            endpoint: "search".into(),
            requests_remaining: remaining,
            requests_limit: limit,
            reset_at: None,
            last_response: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn remaining_percent_is_proportional() {
        assert_eq!(limit_row(30, 60).remaining_percent(), 50.0);
        assert_eq!(limit_row(0, 60).remaining_percent(), 0.0);
    }

    #[test]
    fn remaining_percent_treats_zero_limit_as_untracked() {
        assert_eq!(limit_row(0, 0).remaining_percent(), 100.0);
    }
}
