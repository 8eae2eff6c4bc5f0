//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate resolve overrides and header names/values per rule
//! - Check the configured log level is a known name
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before the route table or any pool is built

use axum::http::header::{HeaderName, HeaderValue};

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A transit rule has no backend base URL.
    EmptyBackendBase { host: String },
    /// `resolve.ip` is set but is not a parseable IP address.
    InvalidResolveIp { host: String, value: String },
    /// `resolve.dns` is set but is not an IP address or socket address.
    InvalidResolveDns { host: String, value: String },
    /// A header name in `set`, `extra` or `remove` is not a valid HTTP
    /// header name.
    InvalidHeaderName { host: String, name: String },
    /// A header value in `set` or `extra` is not a valid HTTP header value.
    InvalidHeaderValue { host: String, name: String },
    /// The configured log level is not a known level name.
    UnknownLogLevel { level: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyBackendBase { host } => {
                write!(f, "rule '{}': backend_base is empty", host)
            }
            ValidationError::InvalidResolveIp { host, value } => {
                write!(f, "rule '{}': resolve.ip '{}' is not an IP address", host, value)
            }
            ValidationError::InvalidResolveDns { host, value } => {
                write!(
                    f,
                    "rule '{}': resolve.dns '{}' is not an IP or socket address",
                    host, value
                )
            }
            ValidationError::InvalidHeaderName { host, name } => {
                write!(f, "rule '{}': invalid header name '{}'", host, name)
            }
            ValidationError::InvalidHeaderValue { host, name } => {
                write!(f, "rule '{}': invalid value for header '{}'", host, name)
            }
            ValidationError::UnknownLogLevel { level } => {
                write!(f, "unknown log level '{}'", level)
            }
        }
    }
}

const KNOWN_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Validate the configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.log.level.is_empty()
        && !KNOWN_LEVELS.contains(&config.log.level.to_lowercase().as_str())
    {
        errors.push(ValidationError::UnknownLogLevel {
            level: config.log.level.clone(),
        });
    }

    for (host, rule) in &config.transit_map {
        if rule.backend_base.is_empty() {
            errors.push(ValidationError::EmptyBackendBase { host: host.clone() });
        }

        if !rule.resolve.ip.is_empty() && rule.resolve.ip.parse::<std::net::IpAddr>().is_err() {
            errors.push(ValidationError::InvalidResolveIp {
                host: host.clone(),
                value: rule.resolve.ip.clone(),
            });
        }

        if !rule.resolve.dns.is_empty()
            && rule.resolve.dns.parse::<std::net::IpAddr>().is_err()
            && rule.resolve.dns.parse::<std::net::SocketAddr>().is_err()
        {
            errors.push(ValidationError::InvalidResolveDns {
                host: host.clone(),
                value: rule.resolve.dns.clone(),
            });
        }

        for (name, value) in rule.headers.set.iter().chain(rule.headers.extra.iter()) {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidHeaderName {
                    host: host.clone(),
                    name: name.clone(),
                });
            } else if HeaderValue::from_str(value).is_err() {
                errors.push(ValidationError::InvalidHeaderValue {
                    host: host.clone(),
                    name: name.clone(),
                });
            }
        }

        for name in &rule.headers.remove {
            if HeaderName::from_bytes(name.as_bytes()).is_err() {
                errors.push(ValidationError::InvalidHeaderName {
                    host: host.clone(),
                    name: name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
