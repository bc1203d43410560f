//! Tracing subscriber setup for the host tools

use crate::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the event filter
///
/// `RUST_LOG` wins over `default_level` when it is set and parses.
pub fn build_filter(default_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", default_level, e))),
    }
}

/// Install the global subscriber
///
/// Events go to stderr; stdout carries command output. Fails if a
/// subscriber is already installed.
pub fn setup_logging(default_level: &str) -> Result<()> {
    let filter = build_filter(default_level)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
