//! Request types.

use indexmap::IndexMap;
use resorm_codec::Payload;
use std::fmt;
use std::time::Duration;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read.
    Get,
    /// Create.
    Post,
    /// Partial update.
    Patch,
    /// Delete.
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// True for methods whose data travels in the query string.
    pub fn uses_query(self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    /// Extra headers for this request.
    pub headers: IndexMap<String, String>,
    /// Timeout override for this request.
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the timeout override.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A request to the remote API.
///
/// The endpoint is relative to the transport's root (e.g., `admin/user/7`).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Relative endpoint.
    pub endpoint: String,
    /// Query parameters (GET/DELETE) or body fields (POST/PATCH).
    pub data: Payload,
    /// Per-request options.
    pub config: RequestConfig,
}

impl Request {
    /// Creates a request with no data.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            data: Payload::new(),
            config: RequestConfig::default(),
        }
    }

    /// Sets the request data.
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    /// Sets the per-request options.
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }
}
