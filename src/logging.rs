//! Logging initialization.
//!
//! The subscriber is installed once at startup from the config's level
//! and optional log file. Components log through `tracing` macros, so
//! tests can capture output deterministically by installing their own
//! subscriber with `tracing::subscriber::with_default`.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Map a configured level name onto an env-filter directive.
/// `RUST_LOG`, when set, wins over the config.
fn level_filter(level: &str) -> EnvFilter {
    let level = match level.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber: stderr always, plus the configured
/// log file when one is set.
pub fn init_logging(config: &LogConfig) -> Result<(), std::io::Error> {
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &config.file {
        Some(path) if !path.is_empty() => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry()
                .with(level_filter(&config.level))
                .with(stderr_layer)
                .with(file_layer)
                .init();
            tracing::info!(level = %config.level, file = %path, "Logging configured");
        }
        _ => {
            tracing_subscriber::registry()
                .with(level_filter(&config.level))
                .with(stderr_layer)
                .init();
            tracing::info!(level = %config.level, "Logging configured");
        }
    }

    Ok(())
}
