//! [`HttpClient`] backed by `reqwest`.

use crate::error::{TransportError, TransportResult};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::request::Method;
use async_trait::async_trait;

/// Production HTTP client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with reqwest's defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already configured reqwest client.
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let mut builder = self
            .inner
            .request(method(request.method), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::client_retryable(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::client_retryable(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
