// 📝 Logging setup
//
// Server: human-readable lines on stderr.
// TUI: the terminal is busy drawing, so events go to a log file instead.
// RUST_LOG overrides the default filter in both cases.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "smart_park=info,tower_http=info";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Log to stderr
pub fn init_console(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Log to `<dir>/<file_name>` (no ANSI colors, no rotation)
pub fn init_file(dir: &Path, file_name: &str, default_filter: &str) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    let appender = tracing_appender::rolling::never(dir, file_name);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(appender)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
