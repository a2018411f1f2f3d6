//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the host every worker listens on (e.g., "http://127.0.0.1").
    pub upstream: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend service families keyed by service name.
    pub services: BTreeMap<String, ServiceConfig>,

    /// Authentication settings.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin diagnostics surface.
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream: "http://127.0.0.1".to_string(),
            listener: ListenerConfig::default(),
            services: BTreeMap::new(),
            auth: AuthConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// One backend service family: a URL prefix and a contiguous port range.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Path prefix routed to this service.
    pub prefix: String,

    /// First port of the worker range.
    pub port: u16,

    /// Number of workers, occupying `port..port + instances`.
    pub instances: u16,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Service key whose workers verify credentials.
    pub service: String,

    /// Login endpoint on the auth service; also the path whose body is
    /// rebuilt from basic credentials when proxied.
    pub login_path: String,

    /// Exact request paths that skip authentication.
    pub exclude: BTreeSet<String>,

    /// Realm advertised in the `WWW-Authenticate` challenge.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            service: "users".to_string(),
            login_path: "/api/v1/users/login".to_string(),
            exclude: BTreeSet::new(),
            realm: String::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single upstream call in seconds.
    pub upstream_secs: u64,

    /// Total time allowed for handling one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 10,
            request_secs: 30,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Include pool snapshots and eviction detail in 5xx responses.
    pub development: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            development: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin diagnostics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin surface.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin surface bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:5001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            upstream = "http://localhost"

            [listener]
            bind_address = "127.0.0.1:5000"

            [services.users]
            prefix = "/api/v1/users"
            port = 5100
            instances = 3

            [services.timelines]
            prefix = "/api/v1/timelines"
            port = 5200
            instances = 2

            [auth]
            login_path = "/api/v1/users/login"
            exclude = ["/api/v1/users/new", "/api/v1/users/login"]

            [observability]
            development = true
        "#;

        let config: GatewayConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.upstream, "http://localhost");
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services["users"].port, 5100);
        assert_eq!(config.services["timelines"].instances, 2);
        assert_eq!(config.auth.service, "users");
        assert!(config.auth.exclude.contains("/api/v1/users/new"));
        assert!(config.observability.development);
        assert_eq!(config.timeouts.upstream_secs, 10);
    }

    #[test]
    fn test_service_requires_all_fields() {
        let raw = r#"
            [services.users]
            prefix = "/api/v1/users"
            instances = 3
        "#;
        assert!(toml::from_str::<GatewayConfig>(raw).is_err());
    }
}
