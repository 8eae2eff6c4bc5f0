//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request + matched TransitRule
//!     → url.rs (backend URL construction)
//!     → forwarder.rs (full body read)
//!     → headers.rs (forward/extra/set/remove pipeline)
//!     → pool.rs (pooled client lookup)
//!     → dial.rs (system / pinned-ip / dns-override connector)
//!     → backend round trip
//!     → Return: completed Trace + response to relay
//! ```
//!
//! # Design Decisions
//! - Pools are created eagerly at startup, one per frontend hostname,
//!   and never at request time
//! - Bodies are buffered fully in memory, never streamed
//! - First failure terminates the request; no retries

pub mod dial;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod pool;
pub mod url;

pub use dial::DialStrategy;
pub use error::ForwardError;
pub use forwarder::forward_request;
pub use headers::build_transit_headers;
pub use pool::{PoolRegistry, PooledClient};
pub use url::build_backend_url;
