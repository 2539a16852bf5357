//! Configuration validator
//!
//! Validates configuration values before they are applied.

use super::loader::{Config, ConfigError, LoggingConfig, PrivilegeConfig};
use crate::privilege::names::is_well_formed;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_privileges(&config.privileges)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates privilege names
    fn validate_privileges(privileges: &PrivilegeConfig) -> Result<(), ConfigError> {
        if privileges.audit_privilege.is_empty() {
            return Err(ConfigError::Invalid(
                "Audit privilege cannot be empty".to_string(),
            ));
        }

        let names = std::iter::once(&privileges.audit_privilege).chain(&privileges.preload);
        for name in names {
            if !is_well_formed(name) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid privilege name: {}. Expected Se...Privilege",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if !VALID_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, VALID_LEVELS
            )));
        }

        if logging.file.is_empty() {
            return Err(ConfigError::Invalid(
                "Log file path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
