//! Worker abstraction.
//!
//! A worker is one running instance of a backend service, identified only by
//! its address. Two workers are the same worker if their addresses match.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// Address of one backend service instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Worker {
    host: Arc<str>,
    port: u16,
}

impl Worker {
    /// Create a worker listening on `host:port`.
    pub fn new(host: impl Into<Arc<str>>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port` with no trailing slash, ready for a path to be appended.
    pub fn base_url(&self) -> String {
        format!("http://{}", self)
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Serialize for Worker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_address() {
        let a = Worker::new("127.0.0.1", 9001);
        let b = Worker::new(String::from("127.0.0.1"), 9001);
        let c = Worker::new("127.0.0.1", 9002);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display_and_url() {
        let w = Worker::new("localhost", 5100);
        assert_eq!(w.to_string(), "localhost:5100");
        assert_eq!(w.base_url(), "http://localhost:5100");
        assert_eq!(serde_json::to_value(&w).unwrap(), "localhost:5100");
    }
}
