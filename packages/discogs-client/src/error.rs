use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscogsError>;

#[derive(Debug, Error)]
pub enum DiscogsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("discogs API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("discogs rate limit hit, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}
