//! HTTP entry point subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (Axum catch-all handler)
//!     → Host header → routing key (port stripped)
//!     → RouteTable lookup (404 short-circuit on miss)
//!     → forward::forward_request
//!     → backend response relayed / 500 with error text
//!     → Trace rendered at debug, summary at info/warn
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
