//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request path + headers
//!     → gate.rs (exclusion set lookup)
//!     → basic.rs (decode Authorization: Basic)
//!     → registry worker for the auth service
//!     → POST <worker><login_path> (form-encoded)
//!     → Authorized | Unauthorized
//! ```
//!
//! # Design Decisions
//! - Fail closed: no verifier means no access
//! - Excluded paths are exact matches, never prefixes

pub mod basic;
pub mod gate;

pub use basic::BasicCredentials;
pub use gate::{AuthDecision, AuthGate, DenyReason};
