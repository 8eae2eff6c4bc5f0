//! Per-backend connection pool registry.
//!
//! One pooled HTTP client per configured frontend hostname, created in a
//! single pass over the route table before the server accepts its first
//! connection. The registry is never mutated afterwards, which is what
//! allows lock-free lookups from concurrent request handlers. Keying by
//! frontend hostname means two routes pointing at the same backend keep
//! separate pools; no route can ever use another route's pool.

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::forward::dial::DialStrategy;
use crate::routing::RouteTable;

/// Idle connections kept per backend host.
const MAX_IDLE_PER_HOST: usize = 20;

/// A pooled HTTP client bound to one route's dial strategy.
pub type PooledClient = Client<DialStrategy, Body>;

/// Immutable mapping from frontend hostname to its pooled client.
pub struct PoolRegistry {
    clients: HashMap<String, PooledClient>,
}

impl PoolRegistry {
    /// Build one pooled client per route, eagerly.
    ///
    /// Pools exist even when a rule's resolve override can never
    /// succeed; such failures surface per request as dial errors.
    pub fn from_routes(table: &RouteTable, timeouts: &TimeoutConfig) -> Self {
        let mut clients = HashMap::with_capacity(table.len());

        for (host, rule) in table.iter() {
            let strategy = DialStrategy::for_override(&rule.resolve);
            tracing::debug!(
                host = %host,
                dial = strategy.kind(),
                "Creating backend connection pool"
            );

            let client = Client::builder(TokioExecutor::new())
                .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
                .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
                .build(strategy);

            clients.insert(host.clone(), client);
        }

        Self { clients }
    }

    /// Look up the pooled client for a frontend hostname.
    pub fn get(&self, host: &str) -> Option<&PooledClient> {
        self.clients.get(host)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, TransitRuleConfig};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn table_for(hosts: &[(&str, &str)]) -> RouteTable {
        let mut config = ProxyConfig::default();
        for (host, base) in hosts {
            config.transit_map.insert(
                host.to_string(),
                TransitRuleConfig {
                    backend_base: base.to_string(),
                    ..Default::default()
                },
            );
        }
        RouteTable::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn every_route_gets_exactly_one_pool() {
        let table = table_for(&[
            ("a.example.com", "backend:9000"),
            ("b.example.com", "backend:9000"),
        ]);
        let registry = PoolRegistry::from_routes(&table, &TimeoutConfig::default());

        assert_eq!(registry.len(), 2);
        assert!(registry.get("a.example.com").is_some());
        assert!(registry.get("b.example.com").is_some());
        assert!(registry.get("c.example.com").is_none());
    }

    /// Minimal keep-alive backend that counts accepted connections.
    async fn counting_backend() -> (std::net::SocketAddr, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            buf.clear();
                            let reply = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n";
                            if stream.write_all(reply).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        (addr, connections)
    }

    async fn get(client: &PooledClient, addr: std::net::SocketAddr) {
        let request = Request::builder()
            .uri(format!("http://{}/", addr))
            .body(Body::empty())
            .unwrap();
        let response = client.request(request).await.unwrap();
        // Drain the body so the connection is checked back in.
        axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn shared_backend_still_keeps_separate_pools() {
        // Keying is by frontend hostname: same backend, distinct pools.
        let (addr, connections) = counting_backend().await;
        let base = addr.to_string();
        let table = table_for(&[("a.example.com", &base), ("b.example.com", &base)]);
        let registry = PoolRegistry::from_routes(&table, &TimeoutConfig::default());

        let a = registry.get("a.example.com").unwrap();
        let b = registry.get("b.example.com").unwrap();

        // The second request through the same route reuses its idle
        // connection, so the counter stays at one.
        get(a, addr).await;
        get(a, addr).await;
        assert_eq!(connections.load(Ordering::SeqCst), 1);

        // The other route cannot see that idle connection: its own pool
        // has to dial the backend itself.
        get(b, addr).await;
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }
}
