//! Logging-related thingies
//!
//! Only the binary installs a subscriber; library callers bring their own
//! (or none, which is fine too).

use tracing_subscriber::EnvFilter;

use crate::error::HollerError;

/// Builds the filter from RUST_LOG, falling back to the configured level.
fn build_filter(log_level: &str, debug: bool) -> EnvFilter {
    let fallback = match debug {
        true => "debug".to_string(),
        false => log_level.to_lowercase(),
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

pub fn init(log_level: &str, debug: bool) -> Result<(), HollerError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(log_level, debug))
        .try_init()
        .map_err(|err| HollerError::Config(format!("Failed to set up logging: {err:?}")))
}
