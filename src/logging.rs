//! Structured logging setup, adapted from the teacher's `logging.rs`:
//! an `EnvFilter`-driven `tracing-subscriber` with an ANSI-formatted layer
//! for interactive use.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize global tracing with `RUST_LOG` (defaulting to `info`) controlling verbosity.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(true);

    if subscriber.try_init().is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}
