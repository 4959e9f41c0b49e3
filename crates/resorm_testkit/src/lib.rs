//! # resorm Testkit
//!
//! Test utilities for resorm.
//!
//! This crate provides:
//! - Record fixtures for a small blog schema (users, posts, profiles,
//!   companies, tags)
//! - [`InMemoryBackend`], a [`Transport`](resorm_transport::Transport)
//!   serving the REST conventions from in-memory tables
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use resorm_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_backend() {
//!     let api = TestApi::new();
//!     let id = api.seed_user("ann", 30);
//!     let mut users = api.users();
//!     users.where_equals("id", id).fetch(None, Payload::new()).await.unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use resorm_codec::{Payload, Value};
}

pub use backend::{InMemoryBackend, NOT_FOUND, VALIDATION_FAILED};
pub use fixtures::*;
pub use generators::*;
