//! Error types for the execution engine client

use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur when talking to the execution engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Engine could not be reached (connection refused, DNS, reset...)
    #[error("execution engine unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    /// Engine call exceeded the configured timeout
    #[error("execution engine call timed out after {0:?}")]
    Timeout(Duration),

    /// Engine answered with a non-success status code
    #[error("execution engine error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body returned by the engine
        message: String,
    },

    /// Engine payload did not match the response contract
    #[error("malformed engine response: {0}")]
    MalformedResponse(String),
}

impl EngineError {
    /// Create a status error from status code and message
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Classify a transport error, distinguishing timeouts
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Unavailable(err)
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this error means the engine answered but could not be understood
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }
}
