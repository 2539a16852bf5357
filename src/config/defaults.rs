//! Default configuration values

use crate::platform::ObjectType;
use crate::privilege::names::{AUDIT_SECTION_PRIVILEGE, SE_SECURITY_NAME};
use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub privileges: PrivilegeDefaults,
    pub transfer: TransferDefaults,
    pub logging: LoggingDefaults,
}

/// Default privilege configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivilegeDefaults {
    pub audit_privilege: String,
    pub preload: Vec<String>,
}

/// Default transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDefaults {
    pub object_type: ObjectType,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        privileges: PrivilegeDefaults {
            audit_privilege: AUDIT_SECTION_PRIVILEGE.to_string(),
            preload: vec![SE_SECURITY_NAME.to_string()],
        },
        transfer: TransferDefaults {
            object_type: ObjectType::File,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: "privilege-transfer.log".to_string(),
        },
    }
}
