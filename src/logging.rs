//! Tracing subscriber setup for embedders without their own.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "qol_framework=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `qol_framework=info`. Does nothing when a global subscriber already exists.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
}
