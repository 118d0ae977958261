//! Log subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::error::{FetchError, Result};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "AGF_LOG";

const DEFAULT_DIRECTIVES: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global fmt subscriber.
///
/// Fails instead of panicking when a subscriber is already installed, so
/// embedding applications and tests can call it more than once.
pub fn init_logging(json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(env_filter());
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| FetchError::Logging(e.to_string()))
}
