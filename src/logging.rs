//! Logging bootstrap for embedders.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init() {
    init_with_default("info");
}

/// Install a fmt subscriber with an explicit default filter.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
