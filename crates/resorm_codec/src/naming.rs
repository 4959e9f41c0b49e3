//! Field naming conventions.
//!
//! Field names on the wire and field names in memory follow different case
//! conventions. A [`NamingConvention`] translates between the two and is
//! applied at every boundary crossing: loading rows, serializing diffs and
//! mapping validation-error keys.

use heck::{ToSnakeCase, ToUpperCamelCase};
use std::fmt::Debug;

/// Translation between wire field names and in-memory attribute names.
pub trait NamingConvention: Send + Sync + Debug {
    /// Converts a wire name (e.g. `user_name`) to its in-memory form.
    fn to_memory(&self, wire: &str) -> String;

    /// Converts an in-memory name back to its wire form.
    fn to_wire(&self, memory: &str) -> String;
}

/// `snake_case` on the wire, `UpperCamelCase` in memory.
///
/// `user_name` is held as `UserName`, `id` as `Id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnakeCaseWire;

impl NamingConvention for SnakeCaseWire {
    fn to_memory(&self, wire: &str) -> String {
        wire.to_upper_camel_case()
    }

    fn to_wire(&self, memory: &str) -> String {
        memory.to_snake_case()
    }
}

/// Keeps names unchanged in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbatim;

impl NamingConvention for Verbatim {
    fn to_memory(&self, wire: &str) -> String {
        wire.to_string()
    }

    fn to_wire(&self, memory: &str) -> String {
        memory.to_string()
    }
}

/// Normalizes a name for placeholder and key matching: lowercase, with
/// `_` and `-` separators removed. `UserId`, `user_id` and `userid` all
/// normalize to `userid`.
pub fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
