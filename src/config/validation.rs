//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (auth service names a configured service)
//! - Validate value ranges (ports, instance counts, timeouts)
//! - Detect conflicting service prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashMap;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("upstream `{0}` is not an http URL with a host")]
    InvalidUpstream(String),
    #[error("service `{0}` has an empty prefix")]
    EmptyPrefix(String),
    #[error("service `{service}` prefix `{prefix}` must start with '/'")]
    RelativePrefix { service: String, prefix: String },
    #[error("service `{0}` has no starting port")]
    MissingPort(String),
    #[error("service `{0}` must have at least one instance")]
    NoInstances(String),
    #[error("service `{0}` port range exceeds 65535")]
    PortOverflow(String),
    #[error("services `{first}` and `{second}` share prefix `{prefix}`")]
    DuplicatePrefix {
        first: String,
        second: String,
        prefix: String,
    },
    #[error("auth service `{0}` is not a configured service")]
    UnknownAuthService(String),
    #[error("login path must start with '/'")]
    InvalidLoginPath,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error(
        "timeouts.request_secs ({request_secs}) must exceed twice timeouts.upstream_secs ({upstream_secs})"
    )]
    RequestTimeoutTooShort { request_secs: u64, upstream_secs: u64 },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.upstream) {
        Ok(url) if url.scheme() == "http" && url.host_str().is_some() => {}
        _ => errors.push(ValidationError::InvalidUpstream(config.upstream.clone())),
    }

    let mut seen_prefixes: HashMap<&str, &str> = HashMap::new();
    for (name, service) in &config.services {
        if service.prefix.is_empty() {
            errors.push(ValidationError::EmptyPrefix(name.clone()));
        } else if !service.prefix.starts_with('/') {
            errors.push(ValidationError::RelativePrefix {
                service: name.clone(),
                prefix: service.prefix.clone(),
            });
        }

        if service.port == 0 {
            errors.push(ValidationError::MissingPort(name.clone()));
        }

        if service.instances == 0 {
            errors.push(ValidationError::NoInstances(name.clone()));
        } else if u32::from(service.port) + u32::from(service.instances) - 1 > u32::from(u16::MAX) {
            errors.push(ValidationError::PortOverflow(name.clone()));
        }

        if let Some(first) = seen_prefixes.insert(&service.prefix, name) {
            errors.push(ValidationError::DuplicatePrefix {
                first: first.to_string(),
                second: name.clone(),
                prefix: service.prefix.clone(),
            });
        }
    }

    if !config.services.contains_key(&config.auth.service) {
        errors.push(ValidationError::UnknownAuthService(config.auth.service.clone()));
    }

    if !config.auth.login_path.starts_with('/') {
        errors.push(ValidationError::InvalidLoginPath);
    }

    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.upstream_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    // A request may spend up to upstream_secs on the credential check and
    // again on the worker call.
    let upstream = config.timeouts.upstream_secs;
    let request = config.timeouts.request_secs;
    if upstream > 0 && request > 0 && request <= upstream.saturating_mul(2) {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: request,
            upstream_secs: upstream,
        });
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroValue("limits.max_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
