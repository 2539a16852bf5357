//! Configuration module
//!
//! Provides configuration loading, validation, default settings and
//! logging setup for embedding applications.

mod defaults;
mod loader;
mod logging;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{load_config, ConfigLoader, DEFAULT_CONFIG_FILE};
pub use logging::init_logging;
pub use validator::{validate_config, ConfigValidator};

// Re-export the configuration structures
pub use loader::{Config, LoggingConfig, PrivilegeConfig, TransferConfig};

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
