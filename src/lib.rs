//! Service gateway library.
//!
//! Routes requests to backend service pools by path prefix, authenticates
//! them against the users service, and evicts workers that answer with
//! server errors.

pub mod admin;
pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
