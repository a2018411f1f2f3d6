//! Service registry.
//!
//! # Responsibilities
//! - Own one `WorkerPool` per configured service family
//! - Resolve request paths to service keys
//! - Delegate worker selection and eviction to the right pool
//!
//! The set of services is fixed at construction. Only pool membership
//! changes afterwards, and only through [`ServiceRegistry::evict`].

use std::collections::{BTreeMap, HashMap};

use url::Url;

use crate::config::ServiceConfig;
use crate::load_balancer::{pool::WorkerPool, worker::Worker};
use crate::observability::metrics;
use crate::routing::PrefixRouter;

/// Error type for registry construction. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("upstream `{0}` has no host")]
    InvalidUpstream(String),
    #[error("service `{0}` has no prefix")]
    MissingPrefix(String),
    #[error("service `{0}` has no starting port")]
    MissingPort(String),
    #[error("service `{0}` needs a positive instance count")]
    NoInstances(String),
    #[error("service `{0}` port range exceeds 65535")]
    PortOverflow(String),
}

/// Owns every worker pool and the prefix table that selects between them.
#[derive(Debug)]
pub struct ServiceRegistry {
    pools: HashMap<String, WorkerPool>,
    router: PrefixRouter,
}

impl ServiceRegistry {
    /// Build pools for each service on consecutive ports of the upstream host.
    pub fn from_config(
        upstream: &str,
        services: &BTreeMap<String, ServiceConfig>,
    ) -> Result<Self, RegistryError> {
        let url = Url::parse(upstream).map_err(|_| RegistryError::InvalidUpstream(upstream.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| RegistryError::InvalidUpstream(upstream.to_string()))?;

        let mut pools = Vec::with_capacity(services.len());
        for (key, service) in services {
            if service.prefix.is_empty() {
                return Err(RegistryError::MissingPrefix(key.clone()));
            }
            if service.port == 0 {
                return Err(RegistryError::MissingPort(key.clone()));
            }
            if service.instances == 0 {
                return Err(RegistryError::NoInstances(key.clone()));
            }
            if service.port.checked_add(service.instances - 1).is_none() {
                return Err(RegistryError::PortOverflow(key.clone()));
            }

            let pool = WorkerPool::with_port_range(&service.prefix, host, service.port, service.instances);
            tracing::info!(
                service = %key,
                prefix = %service.prefix,
                first_port = service.port,
                instances = service.instances,
                "Registered service pool"
            );
            pools.push((key.clone(), pool));
        }

        Ok(Self::new(pools))
    }

    /// Assemble a registry from pre-built pools.
    pub fn new(pools: impl IntoIterator<Item = (String, WorkerPool)>) -> Self {
        let pools: HashMap<String, WorkerPool> = pools.into_iter().collect();
        let router = PrefixRouter::new(
            pools
                .iter()
                .map(|(key, pool)| (key.clone(), pool.prefix().to_string())),
        );

        for (key, pool) in &pools {
            metrics::record_pool_size(key, pool.len());
        }

        Self { pools, router }
    }

    /// Service key whose prefix best matches `path`.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.router.resolve(path)
    }

    /// Next worker for `service_key`; `None` if the pool is empty or unknown.
    pub fn worker_for(&self, service_key: &str) -> Option<Worker> {
        self.pools.get(service_key)?.next()
    }

    /// Remove `worker` from the pool of `service_key`.
    ///
    /// Returns true only if this call removed it; a worker already evicted by
    /// a concurrent request is silently ignored.
    pub fn evict(&self, service_key: &str, worker: &Worker) -> bool {
        let Some(pool) = self.pools.get(service_key) else {
            return false;
        };

        let removed = pool.remove(worker);
        if removed {
            metrics::record_eviction(service_key);
            metrics::record_pool_size(service_key, pool.len());
        }
        removed
    }

    /// Membership of every pool, keyed by service.
    pub fn snapshot_all(&self) -> BTreeMap<String, Vec<Worker>> {
        self.pools
            .iter()
            .map(|(key, pool)| (key.clone(), pool.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services() -> BTreeMap<String, ServiceConfig> {
        let mut services = BTreeMap::new();
        services.insert(
            "users".to_string(),
            ServiceConfig {
                prefix: "/api/v1/users".into(),
                port: 9001,
                instances: 2,
            },
        );
        services.insert(
            "timelines".to_string(),
            ServiceConfig {
                prefix: "/api/v1/timelines".into(),
                port: 9101,
                instances: 3,
            },
        );
        services
    }

    fn registry() -> ServiceRegistry {
        ServiceRegistry::from_config("http://127.0.0.1", &services()).unwrap()
    }

    #[test]
    fn test_from_config_builds_port_ranges() {
        let snapshot = registry().snapshot_all();
        let users: Vec<u16> = snapshot["users"].iter().map(Worker::port).collect();
        let timelines: Vec<u16> = snapshot["timelines"].iter().map(Worker::port).collect();
        assert_eq!(users, vec![9001, 9002]);
        assert_eq!(timelines, vec![9101, 9102, 9103]);
        assert!(snapshot["users"].iter().all(|w| w.host() == "127.0.0.1"));
    }

    #[test]
    fn test_resolve() {
        let registry = registry();
        assert_eq!(registry.resolve("/api/v1/users"), Some("users"));
        assert_eq!(registry.resolve("/api/v1/timelines/home"), Some("timelines"));
        assert_eq!(registry.resolve("/unknown/thing"), None);
    }

    #[test]
    fn test_worker_for_rotates() {
        let registry = registry();
        let ports: Vec<u16> = (0..3)
            .map(|_| registry.worker_for("users").unwrap().port())
            .collect();
        assert_eq!(ports, vec![9001, 9002, 9001]);
        assert!(registry.worker_for("dms").is_none());
    }

    #[test]
    fn test_evict_touches_only_its_pool() {
        let registry = registry();
        let worker = Worker::new("127.0.0.1", 9001);

        assert!(registry.evict("users", &worker));
        assert!(!registry.evict("users", &worker));
        assert!(!registry.evict("dms", &worker));

        let snapshot = registry.snapshot_all();
        assert_eq!(snapshot["users"], vec![Worker::new("127.0.0.1", 9002)]);
        assert_eq!(snapshot["timelines"].len(), 3);
    }

    #[test]
    fn test_rejects_bad_services() {
        let mut bad = services();
        bad.get_mut("users").unwrap().instances = 0;
        assert_eq!(
            ServiceRegistry::from_config("http://127.0.0.1", &bad).unwrap_err(),
            RegistryError::NoInstances("users".into())
        );

        let mut bad = services();
        bad.get_mut("timelines").unwrap().prefix.clear();
        assert_eq!(
            ServiceRegistry::from_config("http://127.0.0.1", &bad).unwrap_err(),
            RegistryError::MissingPrefix("timelines".into())
        );

        let mut bad = services();
        bad.get_mut("users").unwrap().port = 65535;
        assert_eq!(
            ServiceRegistry::from_config("http://127.0.0.1", &bad).unwrap_err(),
            RegistryError::PortOverflow("users".into())
        );

        assert!(matches!(
            ServiceRegistry::from_config("not a url", &services()),
            Err(RegistryError::InvalidUpstream(_))
        ));
    }
}
