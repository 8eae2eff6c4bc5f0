//! Compiled route table.
//!
//! Configuration rules are compiled once at startup into runtime types:
//! header names and values are parsed, the removal list is lowercased
//! into a set, and the resolve override collapses to a single strategy.
//! The resulting table is immutable and shared via `Arc`, so request
//! handling reads it without locks.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};

use axum::http::header::{HeaderName, HeaderValue};

use crate::config::schema::{ProxyConfig, TransitRuleConfig};
use crate::config::validation::ValidationError;

/// Default port for DNS servers given without one.
const DNS_PORT: u16 = 53;

/// Effective name resolution override for one rule. `ip` takes
/// precedence over `dns` when both are configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOverride {
    /// Use the system resolver.
    System,
    /// Dial this address directly, skipping resolution.
    Ip(IpAddr),
    /// Resolve via this DNS server, bypassing the hosts file.
    Dns(SocketAddr),
}

/// Compiled header transformation policy.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    pub forward_client: bool,
    /// Set only when the name has no value yet.
    pub extra: Vec<(HeaderName, HeaderValue)>,
    /// Set unconditionally, replacing forwarded values.
    pub set: Vec<(HeaderName, HeaderValue)>,
    /// Lowercased names stripped from forwarded client headers.
    pub remove: HashSet<String>,
}

/// One compiled transit rule.
#[derive(Debug, Clone)]
pub struct TransitRule {
    /// Backend scheme + host, `http://` assumed when missing.
    pub backend_base: String,
    /// Prefix prepended to the inbound path.
    pub backend_prefix: String,
    pub resolve: ResolveOverride,
    pub headers: HeaderPolicy,
}

impl TransitRule {
    /// Compile one configured rule, reporting every problem found.
    pub fn compile(host: &str, config: &TransitRuleConfig) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        if config.backend_base.is_empty() {
            errors.push(ValidationError::EmptyBackendBase {
                host: host.to_string(),
            });
        }

        let resolve = if !config.resolve.ip.is_empty() {
            match config.resolve.ip.parse::<IpAddr>() {
                Ok(ip) => ResolveOverride::Ip(ip),
                Err(_) => {
                    errors.push(ValidationError::InvalidResolveIp {
                        host: host.to_string(),
                        value: config.resolve.ip.clone(),
                    });
                    ResolveOverride::System
                }
            }
        } else if !config.resolve.dns.is_empty() {
            match parse_dns_server(&config.resolve.dns) {
                Some(server) => ResolveOverride::Dns(server),
                None => {
                    errors.push(ValidationError::InvalidResolveDns {
                        host: host.to_string(),
                        value: config.resolve.dns.clone(),
                    });
                    ResolveOverride::System
                }
            }
        } else {
            ResolveOverride::System
        };

        let mut parse_pairs = |pairs: &HashMap<String, String>| {
            let mut out = Vec::with_capacity(pairs.len());
            for (name, value) in pairs {
                match (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    (Ok(name), Ok(value)) => out.push((name, value)),
                    (Err(_), _) => errors.push(ValidationError::InvalidHeaderName {
                        host: host.to_string(),
                        name: name.clone(),
                    }),
                    (_, Err(_)) => errors.push(ValidationError::InvalidHeaderValue {
                        host: host.to_string(),
                        name: name.clone(),
                    }),
                }
            }
            out
        };

        let extra = parse_pairs(&config.headers.extra);
        let set = parse_pairs(&config.headers.set);

        let remove = config
            .headers
            .remove
            .iter()
            .map(|name| name.to_lowercase())
            .collect();

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            backend_base: config.backend_base.clone(),
            backend_prefix: config.backend_prefix.clone(),
            resolve,
            headers: HeaderPolicy {
                forward_client: config.headers.forward_client,
                extra,
                set,
                remove,
            },
        })
    }
}

fn parse_dns_server(server: &str) -> Option<SocketAddr> {
    if let Ok(ip) = server.parse::<IpAddr>() {
        Some(SocketAddr::new(ip, DNS_PORT))
    } else {
        server.parse::<SocketAddr>().ok()
    }
}

/// Immutable mapping from frontend hostname to its transit rule.
///
/// Built once at startup; request handling only reads it.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: HashMap<String, TransitRule>,
}

impl RouteTable {
    /// Compile the route table from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, Vec<ValidationError>> {
        let mut routes = HashMap::with_capacity(config.transit_map.len());
        let mut errors = Vec::new();

        for (host, rule_config) in &config.transit_map {
            match TransitRule::compile(host, rule_config) {
                Ok(rule) => {
                    routes.insert(host.clone(), rule);
                }
                Err(rule_errors) => errors.extend(rule_errors),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self { routes })
    }

    /// Look up the rule for a frontend hostname (no port).
    pub fn get(&self, host: &str) -> Option<&TransitRule> {
        self.routes.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TransitRule)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strip any port suffix from a `Host` header value to get the routing
/// key. Bracketed IPv6 literals keep their address part.
pub fn host_key(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(raw);
    }
    raw.split(':').next().unwrap_or(raw)
}
