//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path (+ query)
//!     → router.rs (prefix lookup)
//!     → matcher.rs (literal prefix test)
//!     → Return: service key or NoMatch
//!
//! Route Compilation (at startup):
//!     services config
//!     → Sort by prefix length
//!     → Freeze as immutable PrefixRouter
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same service

pub mod matcher;
pub mod router;

pub use router::PrefixRouter;
