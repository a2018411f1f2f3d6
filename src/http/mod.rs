//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, URL reconstruction)
//!     → dispatch.rs (auth → resolve → worker → forward)
//!     → client.rs (single upstream attempt with timeout)
//!     → response.rs (error shaping, header cleanup)
//!     → Send to client
//! ```

pub mod client;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use client::{TransportError, UpstreamClient};
pub use dispatch::{DispatchSettings, Dispatcher};
pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::GatewayServer;
