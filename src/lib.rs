//! Host-header transit proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────┐
//!                   │                 TRANSIT PROXY                   │
//!                   │                                                 │
//!   Client Request  │  ┌────────┐   ┌─────────┐   ┌──────────────┐   │
//!   ────────────────┼─▶│  http  │──▶│ routing │──▶│   forward    │   │
//!                   │  │frontend│   │  table  │   │ url/headers/ │   │
//!                   │  └────────┘   └─────────┘   │  pool/dial   │   │
//!                   │                             └──────┬───────┘   │
//!                   │                                    │           │
//!   Client Response │  ┌────────┐   ┌─────────┐          ▼           │
//!   ◀───────────────┼──│ relay  │◀──│  trace  │◀── backend round     │
//!                   │  └────────┘   │ render  │        trip          │
//!                   │               └─────────┘                      │
//!                   │                                                 │
//!                   │  config (JSON) → RouteTable + PoolRegistry,     │
//!                   │  both frozen before the first request           │
//!                   └────────────────────────────────────────────────┘
//! ```
//!
//! Requests are routed by the `Host` header to one of several configured
//! backends, each behind its own connection pool, with per-route URL
//! prefixing and header rewriting. Every request produces a trace that
//! is rendered as one diagnostic line at debug level.

pub mod args;
pub mod config;
pub mod forward;
pub mod http;
pub mod logging;
pub mod routing;
pub mod trace;

pub use config::ProxyConfig;
pub use forward::PoolRegistry;
pub use http::HttpServer;
pub use routing::RouteTable;
pub use trace::Trace;
