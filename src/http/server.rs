//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the registry, auth gate and dispatcher from config
//! - Create the Axum router with a catch-all proxy handler
//! - Wire up middleware (tracing, request ID, request timeout)
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::AuthGate;
use crate::config::GatewayConfig;
use crate::http::client::UpstreamClient;
use crate::http::dispatch::{DispatchSettings, Dispatcher};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::load_balancer::{RegistryError, ServiceRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
}

impl GatewayServer {
    /// Create a new gateway server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, RegistryError> {
        let registry = Arc::new(ServiceRegistry::from_config(&config.upstream, &config.services)?);
        let client = UpstreamClient::new(Duration::from_secs(config.timeouts.upstream_secs));
        let auth = AuthGate::new(&config.auth, registry.clone(), client.clone());

        let settings = DispatchSettings {
            development: config.observability.development,
            max_body_bytes: config.limits.max_body_bytes,
            realm: config.auth.realm.clone(),
        };
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), auth, client, settings));

        let router = Self::build_router(&config, AppState { dispatcher });
        Ok(Self {
            router,
            config,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::INTERNAL_SERVER_ERROR,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            services = self.registry.snapshot_all().len(),
            "Gateway listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Shared registry, for the admin surface.
    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Catch-all handler: every method and path goes through the dispatcher.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.dispatch(request).await.into_response()
}
