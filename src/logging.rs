//! Process logging for statusboard
//!
//! Diagnostics go through `tracing` to stderr. This is separate from the
//! dashboard's own log ring, which holds entries shown to users.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "statusboard=info";

/// Build the env filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Initialize the global tracing subscriber
///
/// Must be called once, before any tracing calls that should be recorded.
pub fn init_logging() -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}
