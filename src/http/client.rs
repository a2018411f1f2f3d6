//! Outbound HTTP client for worker calls.
//!
//! One attempt per call, bounded by the configured upstream timeout. A
//! timeout is reported like any other transport failure.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

/// The gateway could not obtain a response from the worker.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection to worker failed: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),
    #[error("worker did not respond within {0:?}")]
    Timeout(Duration),
    #[error("request to worker failed: {0}")]
    Request(#[source] hyper_util::client::legacy::Error),
    #[error("reading worker response failed: {0}")]
    Body(#[source] axum::Error),
    #[error("invalid upstream URL `{0}`")]
    InvalidUrl(String),
}

impl TransportError {
    /// Short failure kind reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "ConnectionError",
            TransportError::Timeout(_) => "Timeout",
            TransportError::Request(_) => "RequestError",
            TransportError::Body(_) => "ChunkedEncodingError",
            TransportError::InvalidUrl(_) => "InvalidURL",
        }
    }
}

/// Shared client used for proxied requests and credential checks.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, timeout }
    }

    /// Send a request and wait for the response head.
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let outcome = tokio::time::timeout(self.timeout, self.client.request(request)).await;
        match outcome {
            Ok(Ok(response)) => Ok(into_axum(response)),
            Ok(Err(e)) if e.is_connect() => Err(TransportError::Connect(e)),
            Ok(Err(e)) => Err(TransportError::Request(e)),
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }
}

fn into_axum(response: Response<Incoming>) -> Response<Body> {
    response.map(Body::new)
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}
