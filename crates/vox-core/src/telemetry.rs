//! Common tracing setup shared by every binary crate.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize a `tracing` subscriber reading `RUST_LOG`, defaulting to
/// `info` if unset. Call once near the top of `main`.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
