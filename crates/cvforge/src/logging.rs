//! Process-wide tracing setup.
//!
//! `RUST_LOG` wins over the level passed in. Output goes to stderr so that
//! command output on stdout stays machine-readable.

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("Failed to bridge log records: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

/// Installs the global subscriber (plain text or JSON lines) and routes
/// `log` records from dependencies into it.
pub fn init_logging(level: &str, json: bool) -> Result<(), LoggingError> {
    let filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    } else {
        let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(registry.with(layer))
    };
    installed.map_err(|_| LoggingError::AlreadyInitialized)?;

    tracing_log::LogTracer::init()?;
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| LoggingError::InvalidFilter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}
