// src/logging.rs
// =============================================================================
// Logging setup.
//
// Logs go to stderr so that `--json` output on stdout stays machine-readable.
// RUST_LOG overrides the default filter.
//
// Rust concepts:
// - tracing-subscriber: formats events and filters them by level
// - EnvFilter: RUST_LOG wins over the built-in default
// =============================================================================

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info,site_mirror=debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
