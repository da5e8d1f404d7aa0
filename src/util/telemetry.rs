//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Initialize tracing. Users can install their own subscriber; this helper
/// installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Initialize tracing with explicit filter directives, falling back to
/// `RUST_LOG` when the directives do not parse.
pub fn init_tracing_with(directives: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter `{directives}`: {err}; using RUST_LOG");
        EnvFilter::from_default_env()
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
