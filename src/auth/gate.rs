//! Authentication gate.
//!
//! Every request must carry basic credentials that the auth service accepts,
//! unless its path is in the exclusion set. Credentials are checked by a
//! login call to a worker picked from the same registry the proxy uses.
//!
//! A failing credential check never evicts the auth worker. Only proxied
//! requests feed eviction.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri},
};

use crate::auth::basic::BasicCredentials;
use crate::config::AuthConfig;
use crate::http::client::UpstreamClient;
use crate::load_balancer::ServiceRegistry;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Result of [`AuthGate::authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    Authorized,
    Unauthorized(DenyReason),
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No `Authorization` header, not `Basic`, or undecodable.
    MissingCredentials,
    /// The auth service has no workers left.
    NoVerifier,
    /// The login endpoint answered with something other than 200.
    Rejected(StatusCode),
    /// The login endpoint could not be reached.
    Unreachable,
}

#[derive(Debug)]
pub struct AuthGate {
    exclude: BTreeSet<String>,
    service: String,
    login_path: String,
    registry: Arc<ServiceRegistry>,
    client: UpstreamClient,
}

impl AuthGate {
    pub fn new(config: &AuthConfig, registry: Arc<ServiceRegistry>, client: UpstreamClient) -> Self {
        Self {
            exclude: config.exclude.clone(),
            service: config.service.clone(),
            login_path: config.login_path.clone(),
            registry,
            client,
        }
    }

    /// True if `path` is public.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exclude.contains(path)
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decide whether a request for `path` with `headers` may proceed.
    pub async fn authenticate(&self, path: &str, headers: &HeaderMap) -> AuthDecision {
        if self.is_exempt(path) {
            return AuthDecision::Authorized;
        }

        match BasicCredentials::from_headers(headers) {
            Some(credentials) => self.check_credentials(&credentials).await,
            None => AuthDecision::Unauthorized(DenyReason::MissingCredentials),
        }
    }

    /// Ask a worker of the auth service to verify `credentials`.
    pub async fn check_credentials(&self, credentials: &BasicCredentials) -> AuthDecision {
        let Some(worker) = self.registry.worker_for(&self.service) else {
            tracing::warn!(service = %self.service, "No worker left to verify credentials");
            return AuthDecision::Unauthorized(DenyReason::NoVerifier);
        };

        let target = format!("{}{}", worker.base_url(), self.login_path);
        let Ok(uri) = target.parse::<Uri>() else {
            tracing::error!(url = %target, "Invalid login URL");
            return AuthDecision::Unauthorized(DenyReason::Unreachable);
        };

        let mut request = Request::new(Body::from(credentials.to_form()));
        *request.method_mut() = Method::POST;
        *request.uri_mut() = uri;
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        match self.client.send(request).await {
            Ok(response) if response.status() == StatusCode::OK => {
                tracing::debug!(username = %credentials.username, worker = %worker, "Credentials accepted");
                AuthDecision::Authorized
            }
            Ok(response) => {
                tracing::debug!(
                    username = %credentials.username,
                    worker = %worker,
                    status = %response.status(),
                    "Credentials rejected"
                );
                AuthDecision::Unauthorized(DenyReason::Rejected(response.status()))
            }
            Err(e) => {
                tracing::warn!(worker = %worker, error = %e, "Credential check failed");
                AuthDecision::Unauthorized(DenyReason::Unreachable)
            }
        }
    }
}
