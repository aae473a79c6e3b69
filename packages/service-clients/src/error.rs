//! Error types shared by every service client

use thiserror::Error;

/// Errors that can occur when talking to an external service
///
/// `Clone` so recorded failures can be replayed by test doubles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The service could not be reached
    #[error("connection to {service} failed: {reason}")]
    Connection { service: String, reason: String },

    /// The service answered with an error
    #[error("{service} API error: {message}")]
    Api { service: String, message: String },

    /// The requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Request timeout
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Response could not be interpreted
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Check if this error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection { .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
