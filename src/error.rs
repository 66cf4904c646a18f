//! Error types for the scrape pipeline and storage layer.

use thiserror::Error;

/// Errors produced while fetching pages from the statistics origin.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Target URL is malformed or not https. Fatal, never retried.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Response body was suspiciously small, likely an empty or blocked page.
    #[error("response too small ({size} bytes), likely empty or blocked")]
    EmptyResponse { size: usize },

    /// Response body exceeded the configured size ceiling.
    #[error("response too large ({size} bytes, cap {cap})")]
    TooLarge { size: usize, cap: usize },

    /// Non-2xx status from the origin.
    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// All retry attempts were used up. Wraps the last underlying failure.
    #[error("fetch of {url} failed after {attempts} attempts")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt against the origin makes sense.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::InvalidUrl { .. } | FetchError::Exhausted { .. }
        )
    }
}

/// Errors from the SQLite storage layer.
///
/// Write paths propagate these to the caller; read paths log and degrade to
/// empty results at the repository boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
