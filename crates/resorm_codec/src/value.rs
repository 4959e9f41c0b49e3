//! Dynamic wire value type.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered mapping of field name to value, the shape of every request
/// payload and response row.
pub type Payload = IndexMap<String, Value>;

/// A dynamic value as exchanged with the remote API.
///
/// Maps preserve insertion order so serialized payloads and query strings
/// are deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs, in insertion order.
    Map(IndexMap<String, Value>),
}

/// The kind of a [`Value`], used in diagnostics and schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Null`].
    Null,
    /// [`Value::Bool`].
    Bool,
    /// [`Value::Integer`].
    Integer,
    /// [`Value::Float`].
    Float,
    /// [`Value::Text`].
    Text,
    /// [`Value::Array`].
    Array,
    /// [`Value::Map`].
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Create a map value from key-value pairs, keeping their order.
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for scalars (anything that is not an array or a map).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    ///
    /// Floats without a fractional part are accepted as well.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    /// Get this value as a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|n| u64::try_from(n).ok())
    }

    /// Reads a count leniently: integral numbers and integral numeric text
    /// (`"40"`, `" 40 "`) yield their value, anything else is `None`.
    pub fn coerce_u64(&self) -> Option<u64> {
        match self {
            Value::Text(s) => s.trim().parse().ok(),
            other => other.as_u64(),
        }
    }

    /// Get this value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Returns true for values dropped when joining URL path segments:
    /// null, `false` and the empty string. Numbers are always kept, zero
    /// included.
    pub fn is_blank_segment(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Renders the value the way it appears in a URL path or query string.
    ///
    /// Null renders as the empty string, arrays join their elements with
    /// commas and maps render as JSON.
    pub fn to_param_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(Value::to_param_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Numeric interpretation used by loose comparison.
    fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// Loose (coercive) equality.
    ///
    /// - integers and floats compare numerically
    /// - numeric text equals the number it parses to (`"7" ~ 7`)
    /// - booleans compare as `0`/`1` against numbers and text
    /// - null only equals null
    /// - arrays compare element-wise, and against text through their
    ///   comma-joined rendering
    /// - maps compare key by key
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            (Value::Array(_), Value::Text(s)) | (Value::Text(s), Value::Array(_)) => {
                let array = if let Value::Array(_) = self { self } else { other };
                array.to_param_string() == *s
            }
            (Value::Array(_) | Value::Map(_), _) | (_, Value::Array(_) | Value::Map(_)) => false,
            _ => match (self.coerce_number(), other.coerce_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_param_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_lossless {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

impl_from_lossless!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Float(v as f64),
        }
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::from(v as u64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(n) => serde_json::Value::from(n),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Map(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn counts_accept_numeric_text() {
        assert_eq!(Value::Integer(40).coerce_u64(), Some(40));
        assert_eq!(Value::Float(3.0).coerce_u64(), Some(3));
        assert_eq!(Value::from("40").coerce_u64(), Some(40));
        assert_eq!(Value::from(" 7 ").coerce_u64(), Some(7));
        assert_eq!(Value::from("-1").coerce_u64(), None);
        assert_eq!(Value::from("many").coerce_u64(), None);
        assert_eq!(Value::Integer(-2).coerce_u64(), None);
        assert_eq!(Value::Null.coerce_u64(), None);
    }

    #[test]
    fn loose_numeric_comparisons() {
        assert!(Value::Integer(7).loose_eq(&Value::Float(7.0)));
        assert!(Value::Integer(7).loose_eq(&Value::from("7")));
        assert!(Value::from(" 7 ").loose_eq(&Value::Integer(7)));
        assert!(Value::Bool(true).loose_eq(&Value::Integer(1)));
        assert!(Value::from("").loose_eq(&Value::Integer(0)));
        assert!(!Value::from("seven").loose_eq(&Value::Integer(7)));
    }

    #[test]
    fn null_only_equals_null() {
        assert!(Value::Null.loose_eq(&Value::Null));
        assert!(!Value::Null.loose_eq(&Value::Integer(0)));
        assert!(!Value::from("").loose_eq(&Value::Null));
    }

    #[test]
    fn text_comparison_is_exact() {
        assert!(Value::from("abc").loose_eq(&Value::from("abc")));
        assert!(!Value::from("abc").loose_eq(&Value::from("ABC")));
    }

    #[test]
    fn arrays_and_maps_compare_structurally() {
        let a = Value::from(vec![1, 2]);
        assert!(a.loose_eq(&Value::from(vec!["1", "2"])));
        assert!(a.loose_eq(&Value::from("1,2")));
        assert!(!a.loose_eq(&Value::from(vec![1])));

        let m1 = Value::map([("a", 1), ("b", 2)]);
        let m2 = Value::map([("b", "2"), ("a", "1")]);
        assert!(m1.loose_eq(&m2));
        assert!(!m1.loose_eq(&Value::Integer(1)));
    }

    #[test]
    fn param_rendering() {
        assert_eq!(Value::Null.to_param_string(), "");
        assert_eq!(Value::Float(3.0).to_param_string(), "3");
        assert_eq!(Value::Float(2.5).to_param_string(), "2.5");
        assert_eq!(Value::from(vec![1, 2, 3]).to_param_string(), "1,2,3");
        assert_eq!(Value::map([("a", 1)]).to_param_string(), r#"{"a":1}"#);
    }

    #[test]
    fn blank_segments() {
        assert!(Value::Null.is_blank_segment());
        assert!(Value::from("").is_blank_segment());
        assert!(!Value::Integer(0).is_blank_segment());
        assert!(!Value::from("admin").is_blank_segment());
    }

    #[test]
    fn json_deserialization_keeps_order_and_kinds() {
        let v: Value = serde_json::from_str(r#"{"b": 1, "a": 2.5, "c": null, "d": [true]}"#)
            .unwrap();
        let map = v.as_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a", "c", "d"]);
        assert_eq!(map["b"], Value::Integer(1));
        assert_eq!(map["a"], Value::Float(2.5));
        assert_eq!(map["c"], Value::Null);
        assert_eq!(map["d"], Value::from(vec![true]));
    }

    #[test]
    fn serde_json_value_conversion() {
        let json = serde_json::json!({"id": 7, "name": "x", "tags": ["a"]});
        let value = Value::from(json.clone());
        assert_eq!(value.get("id"), Some(&Value::Integer(7)));
        let back: serde_json::Value = value.into();
        assert_eq!(back, json);
    }

    #[test]
    fn large_unsigned_becomes_float() {
        assert_eq!(Value::from(u64::MAX).kind(), ValueKind::Float);
        assert_eq!(Value::from(5u64), Value::Integer(5));
    }

    proptest! {
        #[test]
        fn loose_eq_is_reflexive_for_integers(n in any::<i64>()) {
            prop_assert!(Value::Integer(n).loose_eq(&Value::Integer(n)));
        }

        #[test]
        fn integer_equals_its_text(n in -1_000_000i64..1_000_000) {
            prop_assert!(Value::Integer(n).loose_eq(&Value::Text(n.to_string())));
            prop_assert!(Value::Text(n.to_string()).loose_eq(&Value::Integer(n)));
        }

        #[test]
        fn loose_eq_is_symmetric(a in -50i64..50, b in "[0-9]{0,2}") {
            let x = Value::Integer(a);
            let y = Value::Text(b);
            prop_assert_eq!(x.loose_eq(&y), y.loose_eq(&x));
        }
    }
}
