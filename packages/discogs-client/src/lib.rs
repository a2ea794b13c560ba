//! Pure Discogs REST API client.
//!
//! Authenticates with the consumer key/secret header scheme and surfaces the
//! `X-Discogs-Ratelimit*` counters alongside every payload so callers can
//! feed them back into their own throttling.

pub mod error;
pub mod types;

pub use error::{DiscogsError, Result};
pub use types::{Credit, Observed, RateLimitInfo, Release, SearchResult};

use chrono::{Duration, Utc};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use types::SearchResponse;

const API_BASE: &str = "https://api.discogs.com";

/// Discogs applies its limit over a moving 60-second window.
const RATE_WINDOW_SECS: i64 = 60;

pub struct DiscogsClient {
    client: reqwest::Client,
    consumer_key: String,
    consumer_secret: String,
}

impl DiscogsClient {
    pub fn new(consumer_key: String, consumer_secret: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("metadata-pipeline/0.1")
            .build()
            .unwrap_or_default();
        Self {
            client,
            consumer_key,
            consumer_secret,
        }
    }

    fn auth_header(&self) -> String {
        format!(
            "Discogs key={}, secret={}",
            self.consumer_key, self.consumer_secret
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Observed<T>> {
        let resp = self
            .client
            .get(url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = resp.status();
        let rate_limit = parse_rate_limit(resp.headers());

        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(RATE_WINDOW_SECS as u64);
            return Err(DiscogsError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DiscogsError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let data = resp.json().await?;
        Ok(Observed { data, rate_limit })
    }

    /// Search releases by artist and track title.
    pub async fn search_release(
        &self,
        artist: &str,
        track: &str,
    ) -> Result<Observed<Vec<SearchResult>>> {
        let url = format!(
            "{}/database/search?type=release&artist={}&track={}&per_page=5",
            API_BASE,
            urlencoded(artist),
            urlencoded(track)
        );
        let observed: Observed<SearchResponse> = self.get_json(&url).await?;
        tracing::debug!(artist, track, count = observed.data.results.len(), "Release search complete");
        Ok(Observed {
            data: observed.data.results,
            rate_limit: observed.rate_limit,
        })
    }

    /// Fetch one release with its credit list.
    pub async fn release(&self, release_id: i64) -> Result<Observed<Release>> {
        let url = format!("{}/releases/{}", API_BASE, release_id);
        self.get_json(&url).await
    }
}

fn urlencoded(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '&' => out.push_str("%26"),
            '#' => out.push_str("%23"),
            '+' => out.push_str("%2B"),
            _ => out.push(c),
        }
    }
    out
}

/// Parse the rate-limit counters from Discogs response headers, if present.
fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let read_int = |name: &str| -> Option<i32> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    };

    let limit = read_int("X-Discogs-Ratelimit")?;
    let remaining = read_int("X-Discogs-Ratelimit-Remaining")?;

    Some(RateLimitInfo {
        limit,
        remaining,
        reset_at: Utc::now() + Duration::seconds(RATE_WINDOW_SECS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn parse_rate_limit_reads_discogs_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Discogs-Ratelimit", HeaderValue::from_static("60"));
        headers.insert(
            "X-Discogs-Ratelimit-Remaining",
            HeaderValue::from_static("23"),
        );

        let info = parse_rate_limit(&headers).unwrap();
        assert_eq!(info.limit, 60);
        assert_eq!(info.remaining, 23);
        assert!(info.reset_at > Utc::now());
    }

    #[test]
    fn parse_rate_limit_returns_none_without_headers() {
        assert!(parse_rate_limit(&HeaderMap::new()).is_none());
    }

    #[test]
    fn release_credits_deserialize() {
        let json = r#"{
            "id": 1,
            "title": "LP",
            "extraartists": [
                {"name": "Quincy Jones", "role": "Producer", "id": 5}
            ]
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.extraartists.len(), 1);
        assert_eq!(release.extraartists[0].role, "Producer");
    }
}
