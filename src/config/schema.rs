//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for the transit proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Server bind settings.
    pub server: ServerConfig,

    /// Logger settings.
    pub log: LogConfig,

    /// Timeout settings shared by all pooled clients.
    pub timeouts: TimeoutConfig,

    /// Transit rules keyed by frontend hostname (without port).
    pub transit_map: HashMap<String, TransitRuleConfig>,
}

/// Server bind configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,

    /// Bind on all interfaces when true, loopback only when false.
    pub public: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            public: false,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Optional log file. Output is written to stderr and this file.
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Timeout configuration applied to every pooled client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one backend round trip, in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout, in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 600,
            idle_secs: 300,
        }
    }
}

/// One transit rule: where requests for a frontend hostname go and how
/// their headers are rewritten on the way.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TransitRuleConfig {
    /// Backend base URL (scheme + host). `http://` is assumed when the
    /// scheme is missing.
    pub backend_base: String,

    /// Prefix prepended to the inbound request path.
    pub backend_prefix: String,

    /// Optional name resolution override for the backend.
    pub resolve: ResolveConfig,

    /// Header transformation policy.
    pub headers: HeadersConfig,
}

/// Name resolution override. At most one takes effect; `ip` wins over
/// `dns` when both are set. Empty strings mean "not set".
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolveConfig {
    /// DNS server to query instead of the system resolver.
    pub dns: String,

    /// Literal IP address to dial, skipping resolution entirely.
    pub ip: String,
}

impl ResolveConfig {
    /// Human-readable summary of the effective override, empty when unset.
    pub fn describe(&self) -> String {
        if !self.ip.is_empty() {
            format!("ip {}", self.ip)
        } else if !self.dns.is_empty() {
            format!("dns {}", self.dns)
        } else {
            String::new()
        }
    }
}

/// Header transformation policy for one rule.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HeadersConfig {
    /// Headers set unconditionally, replacing any forwarded value.
    pub set: HashMap<String, String>,

    /// Headers set only when no value is present yet.
    pub extra: HashMap<String, String>,

    /// Header names stripped from forwarded client headers
    /// (case-insensitive).
    pub remove: Vec<String>,

    /// Forward the client's headers to the backend.
    pub forward_client: bool,
}
