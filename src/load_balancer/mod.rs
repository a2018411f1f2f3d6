//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path
//!     → registry.rs (resolve prefix → service key)
//!     → pool.rs (round-robin over the service's workers)
//!     → worker.rs (address the request is forwarded to)
//!
//! Upstream answered 5xx
//!     → registry.rs evict(service, worker)
//!     → pool.rs remove(worker), cursor kept in range
//! ```
//!
//! # Design Decisions
//! - Plain round-robin, no knowledge of worker load
//! - No active probing; a worker is only dropped after it fails a request
//! - Evicted workers never return for the life of the process

pub mod pool;
pub mod registry;
pub mod worker;

pub use pool::WorkerPool;
pub use registry::{RegistryError, ServiceRegistry};
pub use worker::Worker;
