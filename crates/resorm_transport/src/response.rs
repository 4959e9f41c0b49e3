//! Normalized API response.
//!
//! Every call through a [`Transport`](crate::Transport) resolves to an
//! [`ApiResponse`], successful or not. The wire envelope is:
//!
//! ```json
//! {
//!   "success": true,
//!   "data": { "user": { "id": 7 }, "count": 1 },
//!   "error": { "code": "E-VALIDATION", "text": "Invalid data" },
//!   "validation-errors": { "user_name": "is required" }
//! }
//! ```

use indexmap::IndexMap;
use resorm_codec::{CodecError, CodecResult, Payload, Value};
use serde::Deserialize;

/// Error code of responses synthesized for transport-level failures.
pub const TRANSPORT_FAILURE_CODE: &str = "E-SERVER-ERROR";

/// Error reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable text.
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Value,
    #[serde(default, rename = "validation-errors")]
    validation_errors: Value,
}

/// A normalized response from the remote API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    success: bool,
    status: Option<u16>,
    data: Payload,
    error: ApiError,
    validation_errors: IndexMap<String, String>,
}

impl ApiResponse {
    /// Creates an empty successful response.
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Creates an unsuccessful response.
    pub fn failure(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ApiError {
                code: code.into(),
                text: text.into(),
            },
            ..Self::default()
        }
    }

    /// Creates the generic failure used when the request never produced a
    /// well-formed response (network error, undecodable body).
    pub fn transport_failure(text: impl Into<String>) -> Self {
        Self::failure(TRANSPORT_FAILURE_CODE, text)
    }

    /// Decodes a response envelope from a JSON body.
    pub fn from_slice(bytes: &[u8]) -> CodecResult<Self> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        Ok(Self::from_envelope(envelope))
    }

    /// Builds a response from an already decoded envelope value.
    pub fn from_value(value: Value) -> CodecResult<Self> {
        let json: serde_json::Value = value.into();
        let envelope: Envelope =
            serde_json::from_value(json).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
        Ok(Self::from_envelope(envelope))
    }

    fn from_envelope(envelope: Envelope) -> Self {
        let data = match envelope.data {
            Value::Map(map) => map,
            _ => Payload::new(),
        };

        let error = match envelope.error {
            Value::Map(map) => ApiError {
                code: lookup_text(&map, &["code", "Code"]),
                text: lookup_text(&map, &["text", "Text", "message"]),
            },
            Value::Text(text) => ApiError {
                code: String::new(),
                text,
            },
            _ => ApiError::default(),
        };

        let validation_errors = match envelope.validation_errors {
            Value::Map(map) => map
                .into_iter()
                .map(|(field, message)| (field, message_text(&message)))
                .collect(),
            _ => IndexMap::new(),
        };

        Self {
            success: envelope.success,
            status: None,
            data,
            error,
            validation_errors,
        }
    }

    /// Adds a data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Adds a field validation error.
    pub fn with_validation_error(
        mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.validation_errors.insert(field.into(), message.into());
        self
    }

    /// Records the HTTP status the response arrived with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true if the server reported success.
    pub fn is_successful(&self) -> bool {
        self.success
    }

    /// HTTP status, when the response came over HTTP.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns true if the payload has an entry for `key`.
    pub fn has_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Entity-keyed or table-keyed payload extraction.
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The whole data payload.
    pub fn data_map(&self) -> &Payload {
        &self.data
    }

    /// Error text, empty on success.
    pub fn error(&self) -> &str {
        &self.error.text
    }

    /// Error code, empty on success.
    pub fn error_code(&self) -> &str {
        &self.error.code
    }

    /// Field validation errors, keyed by wire field name.
    pub fn validation_errors(&self) -> &IndexMap<String, String> {
        &self.validation_errors
    }

    /// Re-encodes the response as its wire envelope.
    pub fn to_value(&self) -> Value {
        let mut envelope = Payload::new();
        envelope.insert("success".into(), Value::Bool(self.success));
        envelope.insert("data".into(), Value::Map(self.data.clone()));
        if !self.error.code.is_empty() || !self.error.text.is_empty() {
            envelope.insert(
                "error".into(),
                Value::map([
                    ("code", self.error.code.as_str()),
                    ("text", self.error.text.as_str()),
                ]),
            );
        }
        if !self.validation_errors.is_empty() {
            envelope.insert(
                "validation-errors".into(),
                Value::map(
                    self.validation_errors
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                ),
            );
        }
        Value::Map(envelope)
    }
}

fn lookup_text(map: &Payload, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| map.get(*key))
        .map(Value::to_param_string)
        .unwrap_or_default()
}

/// Validation messages arrive either as a string or a list of strings.
fn message_text(message: &Value) -> String {
    match message {
        Value::Array(items) => items
            .iter()
            .map(Value::to_param_string)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_param_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_envelope() {
        let body = br#"{"success": true, "data": {"user": {"id": 7, "name": "x"}, "count": 1}}"#;
        let r = ApiResponse::from_slice(body).unwrap();
        assert!(r.is_successful());
        assert!(r.has_data("user"));
        assert!(!r.has_data("users"));
        assert_eq!(r.data("count"), Some(&Value::Integer(1)));
        assert_eq!(
            r.data("user").and_then(|u| u.get("id")),
            Some(&Value::Integer(7))
        );
        assert_eq!(r.error(), "");
    }

    #[test]
    fn decodes_failure_envelope() {
        let body = br#"{
            "success": false,
            "error": {"code": "E-VALIDATION", "text": "Invalid"},
            "validation-errors": {"user_name": "is required", "age": ["too low", "not even"]}
        }"#;
        let r = ApiResponse::from_slice(body).unwrap();
        assert!(!r.is_successful());
        assert_eq!(r.error_code(), "E-VALIDATION");
        assert_eq!(r.error(), "Invalid");
        assert_eq!(r.validation_errors()["user_name"], "is required");
        assert_eq!(r.validation_errors()["age"], "too low; not even");
    }

    #[test]
    fn missing_fields_default_to_failure() {
        let r = ApiResponse::from_slice(b"{}").unwrap();
        assert!(!r.is_successful());
        assert!(r.data_map().is_empty());
    }

    #[test]
    fn transport_failure_has_fixed_code() {
        let r = ApiResponse::transport_failure("connection refused");
        assert!(!r.is_successful());
        assert_eq!(r.error_code(), TRANSPORT_FAILURE_CODE);
        assert_eq!(r.error(), "connection refused");
    }

    #[test]
    fn envelope_roundtrip_through_value() {
        let r = ApiResponse::failure("E-VALIDATION", "bad")
            .with_data("user", Value::map([("id", 1)]))
            .with_validation_error("name", "required");
        let back = ApiResponse::from_value(r.to_value()).unwrap();
        assert_eq!(back, r);
    }
}
