use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeniusError>;

#[derive(Debug, Error)]
pub enum GeniusError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("genius API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("genius rate limit hit, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}
