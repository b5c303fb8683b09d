//! GCS client error types.

use morse_core::StorageError;

/// Errors from GCS JSON API calls.
#[derive(Debug, thiserror::Error)]
pub enum GcsError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// GCS returned a non-2xx status.
    #[error("GCS {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Credentials could not be loaded or refreshed.
    #[error("GCS credentials error: {0}")]
    Auth(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<GcsError> for StorageError {
    fn from(err: GcsError) -> Self {
        StorageError::Upstream(err.to_string())
    }
}
