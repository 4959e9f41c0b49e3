//! # resorm Transport
//!
//! Transport abstraction between resorm models and a remote REST API.
//!
//! This crate provides:
//! - The [`Transport`] trait every model talks through
//! - The normalized [`ApiResponse`] envelope
//! - [`HttpTransport`], an HTTP implementation over a pluggable [`HttpClient`]
//! - [`MockTransport`], a scripted transport for tests
//! - `ReqwestClient`, behind the `reqwest` feature
//!
//! ## Key Invariants
//!
//! - A transport never returns an error: failures become unsuccessful
//!   responses with a code and text
//! - GET and DELETE data travel in the query string, POST and PATCH data
//!   as a JSON body
//! - The error handler sees every unsuccessful response

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
#[cfg(feature = "reqwest")]
mod reqwest_client;
mod request;
mod response;
mod transport;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use http::{ErrorHandler, HttpClient, HttpRequest, HttpResponse, HttpTransport};
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;
pub use request::{Method, Request, RequestConfig};
pub use response::{ApiError, ApiResponse, TRANSPORT_FAILURE_CODE};
pub use transport::{MockTransport, Transport};
