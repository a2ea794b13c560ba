//! Pure Spotify Web API client.
//!
//! Authenticates with the OAuth2 client-credentials flow and caches the
//! bearer token until shortly before expiry. Only the catalog endpoints the
//! ingestion pipeline needs are exposed: artist search, genre seeds, artist
//! albums, and album tracks.
//!
//! # Example
//!
//! ```rust,ignore
//! use spotify_client::SpotifyClient;
//!
//! let client = SpotifyClient::new(client_id, client_secret);
//! let artists = client.search_artists("radiohead", 20).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, SpotifyError};
pub use types::{Album, Artist, ArtistRef, Page, Track};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use types::{GenreSeedsResponse, SearchArtistsResponse, TokenResponse};

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh the cached token this long before it actually expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct SpotifyClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            token: RwLock::new(None),
        }
    }

    /// Get a valid bearer token, refreshing through the client-credentials
    /// flow when the cached one is missing or about to expire.
    async fn bearer_token(&self) -> Result<String> {
        {
            let guard = self.token.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let resp = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpotifyError::Auth(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = resp.json().await?;
        let expires_at = Utc::now()
            + Duration::seconds(token.expires_in as i64 - TOKEN_EXPIRY_MARGIN_SECS);
        let access_token = token.access_token.clone();

        let mut guard = self.token.write().await;
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.bearer_token().await?;
        let resp = self.client.get(url).bearer_auth(token).send().await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after_secs = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Err(SpotifyError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.json().await?)
    }

    /// Search artists by free-text query (supports field filters such as
    /// `genre:"hip hop"`).
    pub async fn search_artists(&self, query: &str, limit: u32) -> Result<Vec<Artist>> {
        let url = format!(
            "{}/search?type=artist&q={}&limit={}",
            API_BASE,
            urlencode(query),
            limit
        );
        let resp: SearchArtistsResponse = self.get_json(&url).await?;
        tracing::debug!(query, count = resp.artists.items.len(), "Artist search complete");
        Ok(resp.artists.items)
    }

    /// Fetch the list of available genre seeds.
    pub async fn genre_seeds(&self) -> Result<Vec<String>> {
        let url = format!("{}/recommendations/available-genre-seeds", API_BASE);
        let resp: GenreSeedsResponse = self.get_json(&url).await?;
        Ok(resp.genres)
    }

    /// Fetch one page of an artist's albums.
    pub async fn artist_albums(
        &self,
        artist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Album>> {
        let url = format!(
            "{}/artists/{}/albums?include_groups=album,single&offset={}&limit={}",
            API_BASE, artist_id, offset, limit
        );
        self.get_json(&url).await
    }

    /// Fetch one page of an album's tracks.
    pub async fn album_tracks(
        &self,
        album_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Track>> {
        let url = format!(
            "{}/albums/{}/tracks?offset={}&limit={}",
            API_BASE, album_id, offset, limit
        );
        self.get_json(&url).await
    }
}

/// Minimal percent-encoding for query values (space, quote, hash, ampersand).
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '"' => out.push_str("%22"),
            '#' => out.push_str("%23"),
            '&' => out.push_str("%26"),
            '+' => out.push_str("%2B"),
            _ => out.push(c),
        }
    }
    out
}
