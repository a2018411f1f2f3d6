//! Request dispatch.
//!
//! ```text
//! Received → Authenticated → Resolved → Dispatched → Responded
//!     │            │             │           │
//!     ▼            ▼             ▼           ▼
//!    413          401           404     503 / 500 (+ eviction on 5xx)
//! ```
//!
//! Each request is handled independently. The only state it can change is
//! pool membership, through [`ServiceRegistry::evict`] after a worker
//! answers with a server error.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        request::Parts,
        HeaderValue, Request, Response, Uri,
    },
    response::IntoResponse,
};

use crate::auth::gate::FORM_CONTENT_TYPE;
use crate::auth::{AuthDecision, AuthGate, BasicCredentials};
use crate::http::client::{TransportError, UpstreamClient};
use crate::http::request::{path_and_query, request_id, request_url};
use crate::http::response::{strip_chunked, EvictionReport, GatewayError};
use crate::load_balancer::{ServiceRegistry, Worker};
use crate::observability::metrics;

/// Per-request settings fixed at startup.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Include eviction detail in 500 responses.
    pub development: bool,
    /// Largest request body buffered for forwarding.
    pub max_body_bytes: usize,
    /// Realm for the basic-auth challenge.
    pub realm: String,
}

/// Entry point for every proxied request.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ServiceRegistry>,
    auth: AuthGate,
    client: UpstreamClient,
    settings: DispatchSettings,
}

/// A request bound to a worker.
struct Dispatched {
    service: String,
    worker: Worker,
    target: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        auth: AuthGate,
        client: UpstreamClient,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            auth,
            client,
            settings,
        }
    }

    /// Handle one inbound request and always produce a client response.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().to_string();

        let (parts, body) = request.into_parts();
        let request_id = request_id(&parts);
        let mut service = String::from("none");

        let result = self.handle(&parts, body, &request_id, &mut service).await;
        let response = match result {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(request_id = %request_id, error = %error, "Request ended at gateway");
                error.into_response()
            }
        };

        metrics::record_request(&method, response.status().as_u16(), &service, start);
        response
    }

    async fn handle(
        &self,
        parts: &Parts,
        body: Body,
        request_id: &str,
        service_label: &mut String,
    ) -> Result<Response<Body>, GatewayError> {
        let path = parts.uri.path();
        let url = request_url(parts);

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            path = %path,
            "Dispatching request"
        );

        // Authenticate
        if let AuthDecision::Unauthorized(reason) = self.auth.authenticate(path, &parts.headers).await {
            tracing::info!(request_id = %request_id, path = %path, reason = ?reason, "Unauthorized");
            return Err(GatewayError::Unauthorized {
                realm: self.settings.realm.clone(),
            });
        }

        // Resolve
        let Some(service) = self.registry.resolve(path) else {
            tracing::warn!(request_id = %request_id, path = %path, "No service matched");
            return Err(GatewayError::RouteNotFound { url });
        };
        let service = service.to_string();
        *service_label = service.clone();

        // Buffer before touching the pool so a rejected body leaves the
        // rotation where it was.
        let body = axum::body::to_bytes(body, self.settings.max_body_bytes)
            .await
            .map_err(|_| GatewayError::PayloadTooLarge)?;

        // Obtain worker
        let Some(worker) = self.registry.worker_for(&service) else {
            tracing::warn!(request_id = %request_id, service = %service, "Worker pool exhausted");
            return Err(GatewayError::PoolExhausted {
                service,
                method: parts.method.to_string(),
                url,
            });
        };

        let target = format!("{}{}", worker.base_url(), path_and_query(parts));
        let outbound = self.build_outbound(parts, body, &target)?;
        let dispatched = Dispatched {
            service,
            worker,
            target,
        };

        self.forward(parts, outbound, dispatched, url, request_id).await
    }

    /// Same method, headers and body, aimed at the worker. The login path gets
    /// its body rebuilt from the basic credentials.
    fn build_outbound(&self, parts: &Parts, body: Bytes, target: &str) -> Result<Request<Body>, GatewayError> {
        let uri: Uri = target.parse().map_err(|_| GatewayError::Transport {
            method: parts.method.to_string(),
            url: target.to_string(),
            kind: TransportError::InvalidUrl(target.to_string()).kind(),
        })?;

        let mut headers = parts.headers.clone();
        let body = match BasicCredentials::from_headers(&parts.headers) {
            Some(credentials) if parts.uri.path() == self.auth.login_path() => {
                headers.remove(CONTENT_LENGTH);
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
                Bytes::from(credentials.to_form())
            }
            _ => body,
        };

        let mut request = Request::new(Body::from(body));
        *request.method_mut() = parts.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }

    async fn forward(
        &self,
        parts: &Parts,
        outbound: Request<Body>,
        dispatched: Dispatched,
        url: String,
        request_id: &str,
    ) -> Result<Response<Body>, GatewayError> {
        let Dispatched {
            service,
            worker,
            target,
        } = dispatched;
        let method = parts.method.to_string();

        let response = match self.client.send(outbound).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    service = %service,
                    worker = %worker,
                    error = %e,
                    "Upstream transport failure"
                );
                return Err(GatewayError::Transport {
                    method,
                    url: target,
                    kind: e.kind(),
                });
            }
        };

        let status = response.status();
        if status.as_u16() >= 500 {
            let removed = self.registry.evict(&service, &worker);
            tracing::warn!(
                request_id = %request_id,
                service = %service,
                worker = %worker,
                status = %status,
                removed,
                "Evicting worker after server error"
            );

            let report = self.settings.development.then(|| EvictionReport {
                status: status.as_u16(),
                pools: self.registry.snapshot_all(),
                removed: format!("{} {}", service, worker),
            });
            return Err(GatewayError::Upstream { method, url, report });
        }

        let (mut head, body) = response.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let e = TransportError::Body(e);
                tracing::error!(request_id = %request_id, worker = %worker, error = %e, "Upstream body failed");
                return Err(GatewayError::Transport {
                    method,
                    url: target,
                    kind: e.kind(),
                });
            }
        };

        strip_chunked(&mut head.headers);
        tracing::debug!(
            request_id = %request_id,
            service = %service,
            worker = %worker,
            status = %status,
            "Upstream responded"
        );
        Ok(Response::from_parts(head, Body::from(bytes)))
    }
}
