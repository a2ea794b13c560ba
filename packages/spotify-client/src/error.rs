use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spotify API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("spotify rate limit hit, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("token request failed: {0}")]
    Auth(String),
}
