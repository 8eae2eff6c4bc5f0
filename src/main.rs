use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use transit_proxy::args::Args;
use transit_proxy::config::{load_config, ConfigError};
use transit_proxy::forward::PoolRegistry;
use transit_proxy::http::HttpServer;
use transit_proxy::logging::init_logging;
use transit_proxy::routing::RouteTable;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("transit-proxy: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    init_logging(&config.log)?;

    let table = RouteTable::from_config(&config).map_err(ConfigError::Validation)?;
    for (host, rule) in table.iter() {
        let resolve = config
            .transit_map
            .get(host)
            .map(|r| r.resolve.describe())
            .unwrap_or_default();
        if resolve.is_empty() {
            tracing::info!(
                "transit route: {} -> {}{}",
                host,
                rule.backend_base,
                rule.backend_prefix
            );
        } else {
            tracing::info!(
                "transit route: {} -> {}{} (resolve {})",
                host,
                rule.backend_base,
                rule.backend_prefix,
                resolve
            );
        }
    }

    let table = Arc::new(table);
    // Pools are built before the listener starts accepting; nothing is
    // created lazily at request time.
    let pools = Arc::new(PoolRegistry::from_routes(&table, &config.timeouts));

    let bind_ip = if config.server.public {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    };
    let addr = SocketAddr::new(bind_ip, config.server.port);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, routes = table.len(), "Listening for connections");

    let server = HttpServer::new(table, pools, &config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
