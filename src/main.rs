//! Service gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                       GATEWAY                        │
//!     Client Request       │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!     ─────────────────────┼─▶│  http   │──▶│   auth   │──▶│ service registry │   │
//!                          │  │ server  │   │   gate   │   │  (prefix → pool) │   │
//!                          │  └─────────┘   └────┬─────┘   └────────┬─────────┘   │
//!                          │                     │ login check       │ next()     │
//!                          │                     ▼                   ▼            │
//!     Client Response      │  ┌──────────┐   ┌──────────────────────────────┐     │
//!     ◀────────────────────┼──│ response │◀──│   upstream client (1 try)    │◀────┼── Worker
//!                          │  │ shaping  │   └──────────────┬───────────────┘     │
//!                          │  └──────────┘                  │ 5xx → evict         │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use svc_gateway::config::load_config;
use svc_gateway::lifecycle::startup;
use svc_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "svc-gateway")]
#[command(about = "Path-prefix gateway with round-robin worker pools", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Include pool snapshots and eviction detail in 500 responses.
    #[arg(long, env = "GATEWAY_DEVELOPMENT")]
    development: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    config.observability.development |= cli.development;

    init_logging(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        "svc-gateway starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
