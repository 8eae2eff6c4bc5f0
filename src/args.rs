//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Host-header transit proxy.
#[derive(Debug, Parser)]
#[command(name = "transit-proxy", version, about)]
pub struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,
}
