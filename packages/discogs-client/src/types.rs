use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Rate-limit counters from the `X-Discogs-Ratelimit*` response headers.
///
/// Discogs enforces a moving 60-second window, so `reset_at` is always one
/// window past the observing call.
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub limit: i32,
    pub remaining: i32,
    pub reset_at: DateTime<Utc>,
}

/// A payload together with the rate-limit counters observed on its response.
#[derive(Debug)]
pub struct Observed<T> {
    pub data: T,
    pub rate_limit: Option<RateLimitInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct Release {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub extraartists: Vec<Credit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credit {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub id: Option<i64>,
}
