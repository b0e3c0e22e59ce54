//! Tracing subscriber bootstrap.
//!
//! The crate only emits `tracing` events; embedders that already install a
//! subscriber should skip this and keep their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install an `EnvFilter`-driven fmt subscriber (defaults to `info`).
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
