//! HTTP transport implementation.
//!
//! [`HttpTransport`] turns [`Request`]s into HTTP calls against
//! `{base}/{version}/{endpoint}` and decodes the JSON response envelope.
//! The HTTP client itself is abstracted by [`HttpClient`] so different
//! libraries (reqwest, hyper, a loopback for tests) can be plugged in.

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::request::{Method, Request};
use crate::response::ApiResponse;
use crate::transport::Transport;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Callback invoked with every unsuccessful response.
pub type ErrorHandler = Arc<dyn Fn(&ApiResponse) + Send + Sync>;

/// A fully resolved HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, query string included.
    pub url: String,
    /// Request headers.
    pub headers: IndexMap<String, String>,
    /// JSON body for POST/PATCH.
    pub body: Option<Vec<u8>>,
    /// Request timeout.
    pub timeout: Duration,
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP calls.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes a request and returns the raw response.
    ///
    /// Non-2xx statuses are not errors: the body usually still carries a
    /// response envelope with validation errors.
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse>;
}

/// HTTP-based transport.
///
/// Adds the bearer token to every request, encodes GET/DELETE data as the
/// query string and POST/PATCH data as a JSON body, and invokes the error
/// handler for every unsuccessful response, synthesized transport failures
/// included.
pub struct HttpTransport<C: HttpClient> {
    config: RwLock<TransportConfig>,
    client: C,
    on_error: RwLock<Option<ErrorHandler>>,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(config: TransportConfig, client: C) -> Self {
        Self {
            config: RwLock::new(config),
            client,
            on_error: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> TransportConfig {
        self.config.read().clone()
    }

    /// Sets the bearer token.
    pub fn set_token(&self, token: impl Into<String>) -> &Self {
        self.config.write().token = token.into();
        self
    }

    /// Removes the bearer token.
    pub fn remove_token(&self) -> &Self {
        self.config.write().token.clear();
        self
    }

    /// Sets the base endpoint.
    pub fn set_base_endpoint(&self, uri: impl Into<String>) -> &Self {
        self.config.write().base_endpoint = uri.into();
        self
    }

    /// Sets the version prefix.
    pub fn set_version(&self, version: impl Into<String>) -> &Self {
        self.config.write().version = version.into();
        self
    }

    /// Installs the error handler.
    pub fn set_on_error_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&ApiResponse) + Send + Sync + 'static,
    {
        *self.on_error.write() = Some(Arc::new(handler));
        self
    }

    /// Returns true if an error handler is installed.
    pub fn has_error_handler(&self) -> bool {
        self.on_error.read().is_some()
    }

    /// Returns the last transport-level error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Resolves a [`Request`] into the HTTP request sent on the wire.
    pub fn build_http_request(&self, request: &Request) -> TransportResult<HttpRequest> {
        let config = self.config.read();

        let mut url = config.endpoint_url(&request.endpoint);
        let mut body = None;
        let mut headers = config.headers.clone();
        headers.insert("Accept".into(), "application/json".into());

        if request.method.uses_query() {
            if !request.data.is_empty() {
                let query = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(
                        request
                            .data
                            .iter()
                            .map(|(key, value)| (key.as_str(), value.to_param_string())),
                    )
                    .finish();
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&query);
            }
        } else {
            let bytes = serde_json::to_vec(&request.data)
                .map_err(|e| TransportError::Encode(e.to_string()))?;
            headers.insert("Content-Type".into(), "application/json".into());
            body = Some(bytes);
        }

        if !config.token.is_empty() {
            headers.insert("Authorization".into(), format!("Bearer {}", config.token));
        }
        for (name, value) in &request.config.headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(HttpRequest {
            method: request.method,
            url,
            headers,
            body,
            timeout: request.config.timeout.unwrap_or(config.timeout),
        })
    }

    async fn execute(&self, request: &Request) -> TransportResult<ApiResponse> {
        let http_request = self.build_http_request(request)?;
        let response = self.client.execute(http_request).await?;
        ApiResponse::from_slice(&response.body)
            .map(|r| r.with_status(response.status))
            .map_err(|e| TransportError::InvalidResponse {
                status: response.status,
                message: e.to_string(),
            })
    }

    fn notify_error(&self, response: &ApiResponse) {
        let handler = self.on_error.read().clone();
        if let Some(handler) = handler {
            handler(response);
        }
    }
}

#[async_trait]
impl<C: HttpClient> Transport for HttpTransport<C> {
    async fn send(&self, request: Request) -> ApiResponse {
        debug!(method = %request.method, endpoint = %request.endpoint, "sending request");

        let response = match self.execute(&request).await {
            Ok(response) => {
                *self.last_error.write() = None;
                response
            }
            Err(e) => {
                warn!(method = %request.method, endpoint = %request.endpoint, error = %e, "request failed");
                *self.last_error.write() = Some(e.to_string());
                ApiResponse::transport_failure(e.to_string())
            }
        };

        debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            success = response.is_successful(),
            "request completed"
        );
        if !response.is_successful() {
            self.notify_error(&response);
        }
        response
    }
}
