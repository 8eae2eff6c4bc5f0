//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     transit_map config
//!     → parse header names/values, lowercase removal list
//!     → collapse resolve override (ip > dns > system)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request:
//!     Host header → host_key (strip port) → table lookup
//!     → Return: TransitRule or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact hostname match only, no wildcard or prefix rules
//! - Deterministic: same Host always resolves to the same rule

pub mod table;

pub use table::{host_key, HeaderPolicy, ResolveOverride, RouteTable, TransitRule};
