//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while serializing queries and URLs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A URL template references a field that cannot be serialized.
    #[error("unresolved placeholder {{{placeholder}}} in URL template '{template}'")]
    UnresolvedPlaceholder {
        /// Placeholder name, without braces.
        placeholder: String,
        /// The template being rendered.
        template: String,
    },

    /// A URL template has an unclosed or empty placeholder.
    #[error("malformed URL template '{template}'")]
    MalformedTemplate {
        /// The offending template.
        template: String,
    },

    /// Failed to decode a wire document.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },
}

impl CodecError {
    /// Create an unresolved placeholder error.
    pub fn unresolved_placeholder(placeholder: impl Into<String>, template: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder {
            placeholder: placeholder.into(),
            template: template.into(),
        }
    }

    /// Create a malformed template error.
    pub fn malformed_template(template: impl Into<String>) -> Self {
        Self::MalformedTemplate {
            template: template.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::decoding_failed(e.to_string())
    }
}
