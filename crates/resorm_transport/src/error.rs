//! Error types for the transport layer.
//!
//! These never reach entity or collection callers: [`HttpTransport`]
//! converts every error into an unsuccessful [`ApiResponse`].
//!
//! [`HttpTransport`]: crate::HttpTransport
//! [`ApiResponse`]: crate::ApiResponse

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to the remote API.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network or client error.
    #[error("transport error: {message}")]
    Client {
        /// Error message.
        message: String,
        /// Whether the request could be retried.
        retryable: bool,
    },

    /// The server answered with something that is not a response envelope.
    #[error("invalid response (status {status}): {message}")]
    InvalidResponse {
        /// HTTP status code.
        status: u16,
        /// Decoder message.
        message: String,
    },

    /// The request payload could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,
}

impl TransportError {
    /// Creates a retryable client error.
    pub fn client_retryable(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable client error.
    pub fn client_fatal(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Client { retryable, .. } => *retryable,
            TransportError::Timeout => true,
            TransportError::InvalidResponse { status, .. } => *status >= 500,
            TransportError::Encode(_) => false,
        }
    }
}
