//! Transport layer abstraction.

use crate::request::{Method, Request};
use crate::response::ApiResponse;
use async_trait::async_trait;
use parking_lot::Mutex;
use resorm_codec::Payload;
use std::collections::VecDeque;

/// A transport carries requests to the remote API.
///
/// Implementations never fail: network and decoding problems are turned
/// into unsuccessful [`ApiResponse`]s so callers only ever inspect
/// [`ApiResponse::is_successful`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for its response.
    async fn send(&self, request: Request) -> ApiResponse;

    /// `GET endpoint?data`
    async fn get(&self, endpoint: &str, data: Payload) -> ApiResponse {
        self.send(Request::new(Method::Get, endpoint).with_data(data))
            .await
    }

    /// `POST endpoint` with `data` as body.
    async fn post(&self, endpoint: &str, data: Payload) -> ApiResponse {
        self.send(Request::new(Method::Post, endpoint).with_data(data))
            .await
    }

    /// `PATCH endpoint` with `data` as body.
    async fn patch(&self, endpoint: &str, data: Payload) -> ApiResponse {
        self.send(Request::new(Method::Patch, endpoint).with_data(data))
            .await
    }

    /// `DELETE endpoint?data`
    async fn delete(&self, endpoint: &str, data: Payload) -> ApiResponse {
        self.send(Request::new(Method::Delete, endpoint).with_data(data))
            .await
    }
}

/// A scripted transport for testing.
///
/// Responses are returned in the order they were queued; every request is
/// recorded. When the queue is empty, a transport failure is returned.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Creates a new mock transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: ApiResponse) {
        self.responses.lock().push_back(response);
    }

    /// Queues a response and returns `self`, for construction chains.
    pub fn with_response(self, response: ApiResponse) -> Self {
        self.push_response(response);
        self
    }

    /// Returns every request sent so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending_responses(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> ApiResponse {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| ApiResponse::transport_failure("no mock response queued"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::TRANSPORT_FAILURE_CODE;
    use resorm_codec::Value;

    #[tokio::test]
    async fn mock_transport_returns_queued_responses_in_order() {
        let transport = MockTransport::new()
            .with_response(ApiResponse::success().with_data("n", 1))
            .with_response(ApiResponse::success().with_data("n", 2));

        let first = transport.get("users", Payload::new()).await;
        let second = transport.get("users", Payload::new()).await;
        assert_eq!(first.data("n"), Some(&Value::Integer(1)));
        assert_eq!(second.data("n"), Some(&Value::Integer(2)));
        assert_eq!(transport.pending_responses(), 0);
    }

    #[tokio::test]
    async fn mock_transport_records_requests() {
        let transport = MockTransport::new().with_response(ApiResponse::success());
        let mut data = Payload::new();
        data.insert("name".into(), Value::from("x"));

        transport.post("user", data.clone()).await;

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.endpoint, "user");
        assert_eq!(request.data, data);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn mock_transport_fails_when_exhausted() {
        let transport = MockTransport::new();
        let r = transport.delete("user/1", Payload::new()).await;
        assert!(!r.is_successful());
        assert_eq!(r.error_code(), TRANSPORT_FAILURE_CODE);
    }
}
