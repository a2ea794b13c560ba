use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub genius_access_token: String,
    pub discogs_consumer_key: String,
    pub discogs_consumer_secret: String,
    /// Base URL the scheduler uses for internal fire-and-forget invocations.
    pub internal_base_url: String,
    /// Bearer token required on POST endpoints when set.
    pub internal_bearer_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("PORT must be a valid number")?;

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port,
            spotify_client_id: env::var("SPOTIFY_CLIENT_ID")
                .context("SPOTIFY_CLIENT_ID must be set")?,
            spotify_client_secret: env::var("SPOTIFY_CLIENT_SECRET")
                .context("SPOTIFY_CLIENT_SECRET must be set")?,
            genius_access_token: env::var("GENIUS_ACCESS_TOKEN")
                .context("GENIUS_ACCESS_TOKEN must be set")?,
            discogs_consumer_key: env::var("DISCOGS_CONSUMER_KEY")
                .context("DISCOGS_CONSUMER_KEY must be set")?,
            discogs_consumer_secret: env::var("DISCOGS_CONSUMER_SECRET")
                .context("DISCOGS_CONSUMER_SECRET must be set")?,
            internal_base_url: env::var("INTERNAL_BASE_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{}", port)),
            internal_bearer_token: env::var("INTERNAL_BEARER_TOKEN").ok(),
        })
    }
}
