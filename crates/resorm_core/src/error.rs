//! Error types for resorm core.

use resorm_codec::{CodecError, ValueKind};
use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by entities, collections and the relation resolver.
///
/// These are programmer errors. Remote failures are never reported here:
/// they come back as unsuccessful [`ApiResponse`](resorm_transport::ApiResponse)s.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Reading an attribute that was never set.
    #[error("{record}.{key} is undefined")]
    AttributeNotFound {
        /// Record name.
        record: String,
        /// Requested key.
        key: String,
    },

    /// Writing an attribute that the record does not declare.
    #[error("{record} does not declare attribute {key}")]
    UnknownAttribute {
        /// Record name.
        record: String,
        /// Rejected key.
        key: String,
    },

    /// Reading a nested entity or collection as a scalar.
    #[error("{record}.{key} holds a nested {holds}, not a scalar")]
    NotScalar {
        /// Record name.
        record: String,
        /// Requested key.
        key: String,
        /// What the slot holds.
        holds: &'static str,
    },

    /// Writing a value of the wrong kind.
    #[error("{record}.{key} expects {expected}, got {actual}")]
    TypeMismatch {
        /// Record name.
        record: String,
        /// Attribute key.
        key: String,
        /// Declared kind.
        expected: String,
        /// Kind of the rejected value.
        actual: ValueKind,
    },

    /// Accessing a relation that the record does not declare.
    #[error("{record} has no relation named {relation}")]
    UnknownRelation {
        /// Record name.
        record: String,
        /// Requested relation.
        relation: String,
    },

    /// A relation producer yielded the wrong capability.
    #[error("relation {record}.{relation} must produce {expected}, got {actual}")]
    RelationContractViolation {
        /// Record name.
        record: String,
        /// Relation name.
        relation: String,
        /// Capability the relation kind requires.
        expected: &'static str,
        /// Capability actually produced.
        actual: &'static str,
    },

    /// Data that cannot be loaded into the target.
    #[error("cannot load into {record}: {message}")]
    InvalidPayload {
        /// Record name.
        record: String,
        /// Description of the problem.
        message: String,
    },

    /// URL template error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ModelError {
    /// Creates an attribute not found error.
    pub fn attribute_not_found(record: impl Into<String>, key: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            record: record.into(),
            key: key.into(),
        }
    }

    /// Creates an unknown attribute error.
    pub fn unknown_attribute(record: impl Into<String>, key: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            record: record.into(),
            key: key.into(),
        }
    }

    /// Creates an unknown relation error.
    pub fn unknown_relation(record: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            record: record.into(),
            relation: relation.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            record: record.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_record_and_key() {
        let err = ModelError::attribute_not_found("user", "Nickname");
        assert_eq!(err.to_string(), "user.Nickname is undefined");

        let err = ModelError::RelationContractViolation {
            record: "user".into(),
            relation: "Posts".into(),
            expected: "collection",
            actual: "entity",
        };
        assert!(err.to_string().contains("must produce collection"));
    }

    #[test]
    fn codec_errors_convert() {
        let err: ModelError = CodecError::unresolved_placeholder("Id", "user/{Id}").into();
        assert!(matches!(err, ModelError::Codec(_)));
    }
}
