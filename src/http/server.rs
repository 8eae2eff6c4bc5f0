//! HTTP server setup and request entry point.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Extract the routing key from the Host header
//! - Short-circuit unknown hosts with 404, before any forwarding
//! - Delegate matched requests to the forwarder and relay the result
//! - Log the rendered trace at debug, a summary line at info/warn
//! - Serve with graceful shutdown on SIGINT/SIGTERM

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::forward::{forward_request, ForwardError, PoolRegistry};
use crate::routing::{host_key, RouteTable};

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub pools: Arc<PoolRegistry>,
    /// Total time allowed for one backend round trip.
    pub request_timeout: Duration,
}

/// HTTP server for the transit proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over a frozen route table and pool
    /// registry.
    pub fn new(routes: Arc<RouteTable>, pools: Arc<PoolRegistry>, config: &ProxyConfig) -> Self {
        let state = AppState {
            routes,
            pools,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: route lookup, forwarding, trace logging.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let raw_host = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().host().map(str::to_string))
        .unwrap_or_default();
    let host = host_key(&raw_host).to_string();

    // Unknown hosts never reach the forwarder: no trace, no pool lookup.
    let Some(rule) = state.routes.get(&host) else {
        let error = ForwardError::RouteNotFound(host);
        tracing::warn!("{} {} | {}", request.method(), request.uri().path(), error);
        return (StatusCode::NOT_FOUND, error.to_string()).into_response();
    };

    let (mut trace, response) = forward_request(
        state.pools.as_ref(),
        &host,
        rule,
        request,
        state.request_timeout,
    )
    .await;
    trace.duration = trace.start.elapsed();

    tracing::debug!("{}", trace.render());

    if let Some(error) = &trace.error {
        tracing::warn!(
            "{} {} | time: {:?} | {}",
            trace.method,
            trace.request_url,
            trace.duration,
            error
        );
        (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
    } else if let Some(response) = response {
        tracing::info!(
            "{} {} | time: {:?} | status: {}",
            trace.method,
            trace.request_url,
            trace.duration,
            trace.status.map(|s| s.as_u16()).unwrap_or(0)
        );
        response
    } else {
        // A forwarder that produces neither a response nor an error is a
        // bug; answer like any other forwarding failure.
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "forwarding produced no response".to_string(),
        )
            .into_response()
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
