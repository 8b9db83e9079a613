//! Logging setup emitting JSON lines (or plain text) through `tracing`.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::config::AppCfg;

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber described by `cfg`.
///
/// Subsequent calls are no-ops. If another subscriber is already installed
/// (e.g. by the embedding application) it is left in place.
pub fn init(cfg: &AppCfg) {
    INSTALLED.get_or_init(|| {
        let filter =
            EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);
        let result = if cfg.log_json {
            registry
                .with(fmt::layer().json().with_current_span(false))
                .try_init()
        } else {
            registry.with(fmt::layer()).try_init()
        };
        if let Err(error) = result {
            tracing::debug!(%error, "tracing subscriber already installed");
        }
    });
}
