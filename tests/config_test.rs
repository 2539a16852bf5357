//! Integration tests for configuration and elevator setup

use pretty_assertions::assert_eq;
use privilege_transfer::config::validate_config;
use privilege_transfer::platform::{SimulatedOp, SimulatedSecurityApi};
use privilege_transfer::privilege::names::{SE_BACKUP_NAME, SE_RESTORE_NAME, SE_TAKE_OWNERSHIP_NAME};
use privilege_transfer::{Config, ConfigError, ConfigLoader, ObjectType, PrivilegeElevator};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("privilege-transfer.toml");
    fs::write(
        &path,
        r#"
[privileges]
preload = ["SeBackupPrivilege", "SeRestorePrivilege"]

[transfer]
object_type = "registry_key"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new(&path).load().unwrap();
    assert_eq!(config.privileges.audit_privilege, "SeSecurityPrivilege");
    assert_eq!(config.privileges.preload, vec![SE_BACKUP_NAME, SE_RESTORE_NAME]);
    assert_eq!(config.transfer.object_type, ObjectType::RegistryKey);
    assert_eq!(config.logging, Config::default().logging);
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::new(temp_dir.path().join("saved.toml"));

    let mut config = Config::default();
    config.privileges.audit_privilege = SE_TAKE_OWNERSHIP_NAME.to_string();
    config.logging.level = "debug".to_string();
    loader.save(&config).unwrap();

    assert_eq!(loader.load().unwrap(), config);
}

#[test]
fn test_missing_and_malformed_files() {
    let temp_dir = TempDir::new().unwrap();
    let missing = ConfigLoader::new(temp_dir.path().join("missing.toml"));
    assert!(matches!(missing.load(), Err(ConfigError::FileNotFound(_))));
    assert_eq!(missing.load_or_default(), Config::default());

    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[privileges\naudit_privilege = 1").unwrap();
    let broken = ConfigLoader::new(&path);
    assert!(matches!(broken.load(), Err(ConfigError::TomlParse(_))));
    assert_eq!(broken.load_or_default(), Config::default());
}

#[test]
fn test_elevator_from_config_preloads() {
    let api = Arc::new(SimulatedSecurityApi::new());
    let mut config = Config::default();
    config.privileges.preload = vec![SE_BACKUP_NAME.to_string(), SE_RESTORE_NAME.to_string()];
    config.transfer.object_type = ObjectType::Service;

    let elevator = PrivilegeElevator::with_config(api.clone(), &config).unwrap();
    assert_eq!(elevator.options().object_type, ObjectType::Service);
    assert!(elevator.resolver().contains(SE_BACKUP_NAME));
    assert!(elevator.resolver().contains(SE_RESTORE_NAME));

    let lookups = api.call_count(SimulatedOp::LookupPrivilegeValue);
    elevator.resolve(SE_BACKUP_NAME).unwrap();
    assert_eq!(api.call_count(SimulatedOp::LookupPrivilegeValue), lookups);
}

#[test]
fn test_unresolvable_preload_is_skipped() {
    let api = Arc::new(SimulatedSecurityApi::new());
    let mut config = Config::default();
    config.privileges.preload = vec!["SeVendorPrivilege".to_string(), SE_BACKUP_NAME.to_string()];

    let elevator = PrivilegeElevator::with_config(api, &config).unwrap();
    assert!(!elevator.resolver().contains("SeVendorPrivilege"));
    assert!(elevator.resolver().contains(SE_BACKUP_NAME));
}

#[test]
fn test_invalid_config_rejected() {
    let api = Arc::new(SimulatedSecurityApi::new());

    let mut config = Config::default();
    config.privileges.audit_privilege = "Security".to_string();
    assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    assert!(PrivilegeElevator::with_config(api.clone(), &config).is_err());

    let mut config = Config::default();
    config.logging.level = "chatty".to_string();
    assert!(matches!(
        PrivilegeElevator::with_config(api, &config),
        Err(ConfigError::Invalid(_))
    ));
}
