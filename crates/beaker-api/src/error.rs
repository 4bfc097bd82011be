//! Error types for API operations.

use thiserror::Error;

/// Errors returned by the scheduler API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service responded with a non-success status.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as reported by the service.
        message: String,
    },

    /// The configured API address could not be parsed.
    #[error("invalid api address: {0}")]
    InvalidAddress(String),
}
