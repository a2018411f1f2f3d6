//! Response shaping.
//!
//! # Responsibilities
//! - Map gateway failures to client-visible status codes and JSON bodies
//! - Prepare upstream responses for replay to the client
//!
//! # Design Decisions
//! - Every failure is resolved here; nothing propagates past the handler
//! - Upstream 5xx is always reported as 500; the worker's status only
//!   appears in the body in development mode
//! - `Transfer-Encoding: chunked` from upstream is dropped because the body
//!   is buffered and replayed with a known length

use std::collections::BTreeMap;

use axum::{
    http::{
        header::{TRANSFER_ENCODING, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::load_balancer::Worker;

/// Eviction detail attached to 500 responses in development mode.
#[derive(Debug, Clone, Serialize)]
pub struct EvictionReport {
    /// Status the worker actually returned.
    pub status: u16,
    /// Every pool after the eviction.
    pub pools: BTreeMap<String, Vec<Worker>>,
    /// `"<service> <worker>"`.
    pub removed: String,
}

/// A request that ends without a proxied response.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication required")]
    Unauthorized { realm: String },

    #[error("request body too large or unreadable")]
    PayloadTooLarge,

    #[error("no service matches {url}")]
    RouteNotFound { url: String },

    #[error("{service} service unavailable")]
    PoolExhausted {
        service: String,
        method: String,
        url: String,
    },

    #[error("{method} {url} failed: {kind}")]
    Transport {
        method: String,
        url: String,
        kind: &'static str,
    },

    #[error("{method} {url} failed upstream")]
    Upstream {
        method: String,
        url: String,
        report: Option<EvictionReport>,
    },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::PoolExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Transport { .. } | GatewayError::Upstream { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GatewayError::Unauthorized { realm } => {
                let challenge = format!("Basic realm=\"{}\"", realm.replace('"', ""));
                let mut response = (status, Json(json!({ "message": "authentication required" })))
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    response.headers_mut().insert(WWW_AUTHENTICATE, value);
                }
                response
            }
            GatewayError::PayloadTooLarge => (
                status,
                Json(json!({ "message": "request body too large or unreadable" })),
            )
                .into_response(),
            GatewayError::RouteNotFound { url } => (status, Json(json!({ "url": url }))).into_response(),
            GatewayError::PoolExhausted { service, method, url } => (
                status,
                Json(json!({
                    "message": format!("{} service unavailable.", service.to_lowercase()),
                    "method": method,
                    "url": url,
                })),
            )
                .into_response(),
            GatewayError::Transport { method, url, kind } => (
                status,
                Json(json!({ "method": method, "url": url, "exception": kind })),
            )
                .into_response(),
            GatewayError::Upstream { method, url, report } => {
                let mut body = json!({ "method": method, "url": url });
                if let Some(report) = report {
                    body["status"] = json!(report.status);
                    body["pools"] = json!(report.pools);
                    body["removed"] = json!(report.removed);
                }
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Drop `Transfer-Encoding` when it claims `chunked`. Other codings are kept.
pub fn strip_chunked(headers: &mut HeaderMap) {
    let chunked = headers
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false);

    if chunked {
        headers.remove(TRANSFER_ENCODING);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_carries_challenge() {
        let response = GatewayError::Unauthorized { realm: String::new() }.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic realm=\"\"");
    }

    #[tokio::test]
    async fn test_not_found_echoes_url() {
        let response = GatewayError::RouteNotFound {
            url: "http://localhost/unknown/thing".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "url": "http://localhost/unknown/thing" })
        );
    }

    #[tokio::test]
    async fn test_pool_exhausted_message() {
        let response = GatewayError::PoolExhausted {
            service: "Timelines".into(),
            method: "GET".into(),
            url: "http://localhost/api/v1/timelines".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["message"], "timelines service unavailable.");
        assert_eq!(body["method"], "GET");
    }

    #[tokio::test]
    async fn test_upstream_report_only_when_present() {
        let plain = GatewayError::Upstream {
            method: "GET".into(),
            url: "http://localhost/api/v1/users".into(),
            report: None,
        }
        .into_response();
        assert_eq!(plain.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(plain).await;
        assert!(body.get("pools").is_none());

        let mut pools = BTreeMap::new();
        pools.insert("users".to_string(), vec![Worker::new("127.0.0.1", 9002)]);
        let detailed = GatewayError::Upstream {
            method: "GET".into(),
            url: "http://localhost/api/v1/users".into(),
            report: Some(EvictionReport {
                status: 503,
                pools,
                removed: "users 127.0.0.1:9001".into(),
            }),
        }
        .into_response();
        assert_eq!(detailed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(detailed).await;
        assert_eq!(body["status"], 503);
        assert_eq!(body["pools"]["users"], json!(["127.0.0.1:9002"]));
        assert_eq!(body["removed"], "users 127.0.0.1:9001");
    }

    #[test]
    fn test_strip_chunked() {
        let mut headers = HeaderMap::new();
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("Chunked"));
        strip_chunked(&mut headers);
        assert!(headers.get(TRANSFER_ENCODING).is_none());

        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("gzip, chunked"));
        strip_chunked(&mut headers);
        assert!(headers.get(TRANSFER_ENCODING).is_some());
    }
}
