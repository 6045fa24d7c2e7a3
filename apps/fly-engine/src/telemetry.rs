//! Tracing Setup
//!
//! Initializes the tracing subscriber for console logging.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Log level filter (default: `info`)

use tracing_subscriber::EnvFilter;

/// Initialize console tracing with an environment filter.
///
/// Safe to call once at process startup; a second call is a no-op so tests
/// that share a process do not panic.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init();
}
