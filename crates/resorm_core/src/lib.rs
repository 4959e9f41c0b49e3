//! # resorm Core
//!
//! Client-side relational data mapper for REST resources.
//!
//! This crate provides:
//! - Record metadata ([`RecordInfo`]) declared once per resource type
//! - [`Entity`], a remote record with snapshot-based dirty tracking and a
//!   create/update/delete lifecycle
//! - [`Collection`], a queryable, paginated list with bulk reconciliation
//! - Lazy relations (has-one, belongs-to, has-many, has-many-through) with
//!   foreign-key propagation from parent to child
//!
//! ## Example
//!
//! ```
//! use resorm_codec::Value;
//! use resorm_core::{FieldKind, RecordInfo};
//! use resorm_transport::{MockTransport, Transport};
//! use std::sync::Arc;
//!
//! let post = RecordInfo::builder("post")
//!     .field("title", FieldKind::Text)
//!     .build();
//! let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
//!
//! let mut posts = post.collection(&transport);
//! posts.where_equals("title", "hello").for_page(2, 10);
//! assert_eq!(posts.query_params()["limit"], Value::from("10,10"));
//! ```
//!
//! ## Key Invariants
//!
//! - Nothing is cached across process lifetimes: every entity is a
//!   transient projection of remote state
//! - Remote and validation failures are values, never errors
//! - A failed bulk update rolls every item back to its snapshot
//! - Relation access never discards the cache and always re-propagates keys

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod entity;
mod error;
mod record;
mod relation;
#[cfg(test)]
mod test_records;

pub use collection::{Collection, FilterScope};
pub use entity::{Entity, Slot};
pub use error::{ModelError, ModelResult};
pub use record::{FieldDef, FieldKind, RecordBuilder, RecordInfo, DEFAULT_PRIMARY_KEY};
pub use relation::{
    Related, RelationDescriptor, RelationKind, RelationOptions, RelationProducer,
    DISCRIMINATOR_FIELD,
};
