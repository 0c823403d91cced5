//! Tracing subscriber setup.

use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "REPO_INTEL_LOG";

/// Resolves the filter directive: `REPO_INTEL_LOG`, then `RUST_LOG`, then `warn`.
#[must_use]
pub fn filter_directive() -> String {
    env::var(LOG_ENV)
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string())
}

/// Installs the global subscriber, writing compact lines to stderr.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logger() {
    let filter_layer =
        EnvFilter::try_new(filter_directive()).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).without_time())
        .with(filter_layer)
        .try_init();
}
