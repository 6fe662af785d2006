//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Failure to install the global subscriber.
#[derive(Debug, Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back
/// to `default_filter` when the variable is unset or invalid.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError(e.to_string()))
}
