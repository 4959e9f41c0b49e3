//! # resorm Codec
//!
//! Wire-format primitives for resorm.
//!
//! This crate provides:
//! - [`Value`], the dynamic value exchanged with the remote API, with the
//!   loose equality used for change detection
//! - [`NamingConvention`], the wire/memory field-name translation
//! - the query filter serializer ([`FilterSet`], [`SortSpec`],
//!   [`Pagination`], [`build_query`])
//! - the URL templater ([`UrlTemplate`], [`join_path`])
//!
//! Everything in this crate is pure: no I/O, no shared state.
//!
//! ## Usage
//!
//! ```
//! use resorm_codec::{build_query, FilterSet, Pagination, SortSpec, Value};
//!
//! let mut filters = FilterSet::new();
//! filters.greater_than("age", 18);
//! let mut sort = SortSpec::new();
//! sort.sort_by("name", false);
//! let page = Pagination { offset: 20, count: 10 };
//!
//! let params = build_query(&FilterSet::new(), &filters, &page, &sort);
//! assert_eq!(params["age-GT"], Value::Integer(18));
//! assert_eq!(params["limit"], Value::from("20,10"));
//! assert_eq!(params["sort-by"], Value::from("name,ASC"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;
mod naming;
mod template;
mod value;

pub use error::{CodecError, CodecResult};
pub use filter::{
    build_query, filter_key, join_values, FilterOperator, FilterSet, Pagination, SortSpec,
    DEFAULT_PER_PAGE, LIMIT_PARAM, NULL_SENTINEL, SORT_PARAM,
};
pub use naming::{normalize_key, NamingConvention, SnakeCaseWire, Verbatim};
pub use template::{join_path, render_template, UrlTemplate};
pub use value::{Payload, Value, ValueKind};

/// Decodes a JSON document into a [`Value`].
pub fn from_json(bytes: &[u8]) -> CodecResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Encodes a [`Value`] as a JSON document.
pub fn to_json(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}
