//! Log subscriber setup.
//!
//! The library only emits `tracing` events. Binaries and test harnesses that
//! want them on stderr call [`init`] once at startup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{DispatchError, Result};

/// Filter used when neither the configuration nor `RUST_LOG` sets one.
pub const DEFAULT_FILTER: &str = "warn";

/// Build the event filter: the configured directive, else `RUST_LOG`, else
/// [`DEFAULT_FILTER`].
///
/// # Errors
///
/// Returns an error if the configured directive does not parse.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match &config.filter {
        Some(directive) => EnvFilter::try_new(directive).map_err(|e| {
            DispatchError::logging(format!("invalid filter '{directive}': {e}"))
        }),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Install a global fmt subscriber writing to stderr.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(config)?);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.with_target);

    let installed = match config.format {
        LogFormat::Full => registry.with(layer).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    installed.map_err(|e| DispatchError::logging(e.to_string()))
}
