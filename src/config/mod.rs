//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into RouteTable + PoolRegistry at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    HeadersConfig, LogConfig, ProxyConfig, ResolveConfig, ServerConfig, TimeoutConfig,
    TransitRuleConfig,
};
