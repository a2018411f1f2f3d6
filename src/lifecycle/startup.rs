//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the metrics exporter and admin listener when enabled
//! - Bind the gateway listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::GatewayConfig;
use crate::http::GatewayServer;
use crate::lifecycle::{shutdown::Shutdown, signals::shutdown_on_signal};
use crate::load_balancer::RegistryError;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("service registry: {0}")]
    Registry(#[from] RegistryError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Start every subsystem and serve until a termination signal arrives.
pub async fn run(config: GatewayConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));
    serve(config, shutdown).await
}

/// Start every subsystem and serve until `shutdown` is triggered.
pub async fn serve(config: GatewayConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.observability.development {
        tracing::warn!("Development mode: 5xx responses include pool snapshots");
    }
    if !config.auth.exclude.contains(&config.auth.login_path) {
        tracing::warn!(
            login_path = %config.auth.login_path,
            "Login path is not excluded from authentication"
        );
    }

    let server = GatewayServer::new(config)?;

    if server.config().admin.enabled {
        let admin = server.config().admin.clone();
        let listener = bind(&admin.bind_address).await?;
        let router = setup_admin_router(AdminState {
            registry: server.registry(),
            api_key: Arc::from(admin.api_key.as_str()),
        });
        let mut admin_shutdown = shutdown.subscribe();

        tracing::info!(address = %admin.bind_address, "Admin surface listening");
        tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    let listener = bind(&server.config().listener.bind_address).await?;
    let result = server.run(listener, shutdown.subscribe()).await;

    // Stop the admin listener even if the gateway exited on its own.
    shutdown.trigger();
    result.map_err(StartupError::from)
}
