//! Configuration loader
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use crate::platform::ObjectType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File read by [`load_config`]
pub const DEFAULT_CONFIG_FILE: &str = "privilege-transfer.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_privileges")]
    pub privileges: PrivilegeConfig,

    #[serde(default = "default_transfer")]
    pub transfer: TransferConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Privilege configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeConfig {
    /// Privilege enabled around SACL writes
    #[serde(default = "default_audit_privilege")]
    pub audit_privilege: String,
    /// Names resolved up front
    #[serde(default = "default_preload")]
    pub preload: Vec<String>,
}

/// Transfer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferConfig {
    #[serde(default = "default_object_type")]
    pub object_type: ObjectType,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        debug!(path = %self.config_path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads configuration or returns defaults if the file is missing or
    /// unreadable
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            debug!(error = %e, "using default configuration");
            Config::default()
        })
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location, falling back to
/// defaults when the file does not exist
pub fn load_config() -> Result<Config, ConfigError> {
    match ConfigLoader::new(DEFAULT_CONFIG_FILE).load() {
        Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
        other => other,
    }
}

// Default functions for serde
fn default_privileges() -> PrivilegeConfig {
    let defaults = default_config();
    PrivilegeConfig {
        audit_privilege: defaults.privileges.audit_privilege,
        preload: defaults.privileges.preload,
    }
}

fn default_transfer() -> TransferConfig {
    TransferConfig {
        object_type: default_config().transfer.object_type,
    }
}

fn default_logging() -> LoggingConfig {
    let defaults = default_config();
    LoggingConfig {
        level: defaults.logging.level,
        file: defaults.logging.file,
    }
}

// Individual field defaults
fn default_audit_privilege() -> String {
    default_config().privileges.audit_privilege
}

fn default_preload() -> Vec<String> {
    default_config().privileges.preload
}

fn default_object_type() -> ObjectType {
    default_config().transfer.object_type
}

fn default_log_level() -> String {
    default_config().logging.level
}

fn default_log_file() -> String {
    default_config().logging.file
}

impl Default for Config {
    fn default() -> Self {
        Config {
            privileges: default_privileges(),
            transfer: default_transfer(),
            logging: default_logging(),
        }
    }
}
