//! Configuration for the HTTP transport.

use indexmap::IndexMap;
use std::time::Duration;

/// Configuration for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base endpoint of the API (e.g., "https://api.example.com").
    pub base_endpoint: String,
    /// Version prefix inserted after the base endpoint (e.g., "v1").
    pub version: String,
    /// Bearer token sent with every request. Empty means no token.
    pub token: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Headers added to every request.
    pub headers: IndexMap<String, String>,
}

impl TransportConfig {
    /// Creates a new configuration for a base endpoint.
    pub fn new(base_endpoint: impl Into<String>) -> Self {
        Self {
            base_endpoint: base_endpoint.into(),
            version: String::new(),
            token: String::new(),
            timeout: Duration::from_secs(30),
            headers: IndexMap::new(),
        }
    }

    /// Sets the version prefix.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// `{base}/{version}`, with empty parts and duplicate slashes removed.
    pub fn endpoint_root(&self) -> String {
        [self.base_endpoint.trim_end_matches('/'), self.version.trim_matches('/')]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Full URL of an endpoint relative to the root.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.trim_start_matches('/');
        let root = self.endpoint_root();
        if endpoint.is_empty() {
            root
        } else if root.is_empty() {
            endpoint.to_string()
        } else {
            format!("{root}/{endpoint}")
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_config_builder() {
        let config = TransportConfig::new("https://api.example.com")
            .with_version("v2")
            .with_token("secret")
            .with_timeout(Duration::from_secs(5))
            .with_header("X-Client", "resorm");

        assert_eq!(config.base_endpoint, "https://api.example.com");
        assert_eq!(config.version, "v2");
        assert_eq!(config.token, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.headers.get("X-Client").map(String::as_str), Some("resorm"));
    }

    #[test]
    fn endpoint_urls() {
        let config = TransportConfig::new("https://api.example.com/").with_version("v1");
        assert_eq!(config.endpoint_root(), "https://api.example.com/v1");
        assert_eq!(config.endpoint_url("users/1"), "https://api.example.com/v1/users/1");
        assert_eq!(config.endpoint_url("/users"), "https://api.example.com/v1/users");

        let unversioned = TransportConfig::new("https://api.example.com");
        assert_eq!(unversioned.endpoint_url("users"), "https://api.example.com/users");
    }
}
