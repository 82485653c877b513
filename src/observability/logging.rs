//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from [`LogConfig`]
//! - Honour `RUST_LOG` when set, otherwise `--log.level`
//!
//! # Design Decisions
//! - JSON format for machine parsing, compact logfmt-style text otherwise
//! - Initialization is idempotent: the first call wins, later calls are no-ops

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Build the filter for a configuration.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

/// Install the global subscriber. Returns false if one was already installed.
pub fn init_logging(config: &LogConfig) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
        LogFormat::Logfmt => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };

    result.is_ok()
}
