//! Structured logging configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Plain text or JSON output
//! - Level from `RUST_LOG`, falling back to the configured level

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

use crate::Error;

/// Tracing configuration options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON output format
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl TracingConfig {
    /// Pick the level from the operator's flags. `debug` wins over `verbose`,
    /// which wins over the explicit level.
    #[must_use]
    pub fn from_flags(level: &str, verbose: bool, debug: bool, json: bool) -> Self {
        let level = if debug {
            "trace"
        } else if verbose {
            "debug"
        } else {
            level
        };
        Self {
            level: level.to_string(),
            json,
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// Sets up the tracing subscriber with:
/// - Configured log level from environment or config
/// - Plain text or JSON output
///
/// Returns an error instead of panicking when a subscriber is already installed.
///
/// # Errors
///
/// Returns an error if a global subscriber was set earlier.
pub fn init_tracing(config: &TracingConfig) -> crate::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let result = if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer().with_target(false);

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };
    result.map_err(|e| Error::internal(format!("failed to initialize tracing: {e}")))?;

    tracing::debug!("Tracing initialized: level={}, json={}", config.level, config.json);
    Ok(())
}
