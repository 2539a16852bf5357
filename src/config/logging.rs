//! Subscriber installation from [`LoggingConfig`]

use super::loader::{ConfigError, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs a global formatted subscriber appending to the configured file
/// at the configured level.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is kept.
pub fn init_logging(logging: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = EnvFilter::try_new(logging.level.to_lowercase())
        .map_err(|e| ConfigError::Invalid(format!("Invalid log level {}: {}", logging.level, e)))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logging.file)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        info!(
            "privilege-transfer v{} logging at {}",
            env!("CARGO_PKG_VERSION"),
            logging.level
        );
    }
    Ok(installed)
}
