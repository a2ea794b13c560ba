//! Pure Genius REST API client.
//!
//! Covers song search and song lookup, which together expose the producer
//! credits (`producer_artists`) the enrichment pipeline consumes.

pub mod error;
pub mod types;

pub use error::{GeniusError, Result};
pub use types::{GeniusArtist, Hit, Song};

use serde::de::DeserializeOwned;
use types::{Envelope, SearchResponse, SongResponse};

const API_BASE: &str = "https://api.genius.com";

pub struct GeniusClient {
    client: reqwest::Client,
    access_token: String,
}

impl GeniusClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Err(GeniusError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GeniusError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Search songs; returns the hit list in relevance order.
    pub async fn search(&self, query: &str) -> Result<Vec<Hit>> {
        let url = format!("{}/search?q={}", API_BASE, urlencoded(query));
        let envelope: Envelope<SearchResponse> = self.get_json(&url).await?;
        Ok(envelope.response.hits)
    }

    /// Fetch one song with its full credit lists.
    pub async fn song(&self, song_id: i64) -> Result<Song> {
        let url = format!("{}/songs/{}?text_format=plain", API_BASE, song_id);
        let envelope: Envelope<SongResponse> = self.get_json(&url).await?;
        Ok(envelope.response.song)
    }
}

fn urlencoded(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '&' => "%26".to_string(),
            '#' => "%23".to_string(),
            '+' => "%2B".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_envelope_deserializes() {
        let json = r#"{
            "meta": {"status": 200},
            "response": {
                "hits": [
                    {"result": {"id": 42, "title": "Song", "primary_artist": {"id": 7, "name": "Artist"}}}
                ]
            }
        }"#;
        let envelope: Envelope<SearchResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.response.hits.len(), 1);
        assert_eq!(envelope.response.hits[0].result.id, 42);
        assert_eq!(envelope.response.hits[0].result.primary_artist.name, "Artist");
    }

    #[test]
    fn song_producer_credits_deserialize() {
        let json = r#"{
            "meta": {"status": 200},
            "response": {
                "song": {
                    "id": 42,
                    "title": "Song",
                    "producer_artists": [{"id": 1, "name": "Rick Rubin"}]
                }
            }
        }"#;
        let envelope: Envelope<SongResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.response.song.producer_artists.len(), 1);
        assert_eq!(envelope.response.song.producer_artists[0].name, "Rick Rubin");
    }
}
