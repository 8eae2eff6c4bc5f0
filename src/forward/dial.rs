//! Per-backend dial strategies.
//!
//! Each pooled client owns one strategy, chosen at pool construction
//! from the rule's resolve override. The strategy is a connector in the
//! same seam as `HttpConnector`, so the pooled client treats all three
//! the same way. Resolution failures under an override surface as dial
//! errors on the request that triggered them, never at startup.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::Uri;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::TokioAsyncResolver;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower::Service;

use crate::routing::ResolveOverride;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connector selecting how a backend address is dialed.
#[derive(Clone)]
pub enum DialStrategy {
    /// System resolver via the stock connector.
    System(HttpConnector),
    /// Dial the configured address directly; the URI host is ignored.
    PinnedIp(IpAddr),
    /// Resolve the URI host against a specific DNS server, bypassing
    /// the hosts file, then dial the first answer.
    DnsOverride(TokioAsyncResolver),
}

impl DialStrategy {
    /// Build the strategy for one rule's resolve override.
    pub fn for_override(resolve: &ResolveOverride) -> Self {
        match resolve {
            ResolveOverride::System => DialStrategy::System(HttpConnector::new()),
            ResolveOverride::Ip(ip) => DialStrategy::PinnedIp(*ip),
            ResolveOverride::Dns(server) => {
                let mut config = ResolverConfig::new();
                config.add_name_server(NameServerConfig::new(*server, Protocol::Udp));
                let mut opts = ResolverOpts::default();
                // The point of the override is to bypass local aliasing.
                opts.use_hosts_file = false;
                // A records first, AAAA on no answer.
                opts.ip_strategy = LookupIpStrategy::Ipv4thenIpv6;
                DialStrategy::DnsOverride(TokioAsyncResolver::tokio(config, opts))
            }
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DialStrategy::System(_) => "system",
            DialStrategy::PinnedIp(_) => "pinned-ip",
            DialStrategy::DnsOverride(_) => "dns-override",
        }
    }
}

fn dst_port(dst: &Uri) -> u16 {
    dst.port_u16()
        .unwrap_or(if dst.scheme_str() == Some("https") { 443 } else { 80 })
}

async fn dial(addr: SocketAddr) -> Result<TokioIo<TcpStream>, BoxError> {
    let stream = TcpStream::connect(addr).await?;
    Ok(TokioIo::new(stream))
}

impl Service<Uri> for DialStrategy {
    type Response = TokioIo<TcpStream>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self {
            DialStrategy::System(connector) => connector.poll_ready(cx).map_err(Into::into),
            DialStrategy::PinnedIp(_) | DialStrategy::DnsOverride(_) => Poll::Ready(Ok(())),
        }
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        match self {
            DialStrategy::System(connector) => {
                let fut = connector.call(dst);
                Box::pin(async move { fut.await.map_err(Into::into) })
            }
            DialStrategy::PinnedIp(ip) => {
                let addr = SocketAddr::new(*ip, dst_port(&dst));
                tracing::debug!(uri = %dst, address = %addr, "Dialing pinned address");
                Box::pin(dial(addr))
            }
            DialStrategy::DnsOverride(resolver) => {
                let resolver = resolver.clone();
                Box::pin(async move {
                    let port = dst_port(&dst);
                    let host = dst
                        .host()
                        .ok_or_else(|| format!("no host in backend URI: {}", dst))?
                        .trim_matches(|c| c == '[' || c == ']')
                        .to_string();

                    // Literal addresses skip the resolver.
                    let ip = match host.parse::<IpAddr>() {
                        Ok(ip) => ip,
                        Err(_) => {
                            let lookup = resolver.lookup_ip(host.as_str()).await?;
                            let ip = lookup
                                .iter()
                                .next()
                                .ok_or_else(|| format!("no addresses found for {}", host))?;
                            tracing::debug!(host = %host, ip = %ip, "Resolved via DNS override");
                            ip
                        }
                    };

                    dial(SocketAddr::new(ip, port)).await
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_follows_override() {
        let system = DialStrategy::for_override(&ResolveOverride::System);
        assert_eq!(system.kind(), "system");

        let pinned = DialStrategy::for_override(&ResolveOverride::Ip("192.0.2.7".parse().unwrap()));
        assert_eq!(pinned.kind(), "pinned-ip");

        let dns =
            DialStrategy::for_override(&ResolveOverride::Dns("10.0.0.53:53".parse().unwrap()));
        assert_eq!(dns.kind(), "dns-override");
    }

    #[test]
    fn port_defaults_follow_scheme() {
        let http: Uri = "http://backend/x".parse().unwrap();
        assert_eq!(dst_port(&http), 80);
        let https: Uri = "https://backend/x".parse().unwrap();
        assert_eq!(dst_port(&https), 443);
        let explicit: Uri = "http://backend:9000/x".parse().unwrap();
        assert_eq!(dst_port(&explicit), 9000);
    }

    #[tokio::test]
    async fn pinned_ip_dials_configured_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut strategy = DialStrategy::PinnedIp(addr.ip());
        // URI host is a name that must never be resolved.
        let dst: Uri = format!("http://ignored.invalid:{}/", addr.port())
            .parse()
            .unwrap();
        let accept = tokio::spawn(async move { listener.accept().await });
        strategy.call(dst).await.unwrap();
        accept.await.unwrap().unwrap();
    }
}
