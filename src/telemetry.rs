//! Tracing subscriber setup shared by the HTTP service and the CLI.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::app::env_flag;

/// Install the global subscriber: `RUST_LOG` filter (default `brush_recommender=info,warn`),
/// compact output, or JSON lines when `BRUSH_LOG_JSON=1`.
///
/// Safe to call when a subscriber is already installed (e.g. by the hosting runtime); the
/// existing one is kept.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("brush_recommender=info,warn"));

    let result = if env_flag("BRUSH_LOG_JSON") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
