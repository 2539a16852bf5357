//! Integration tests against the real Windows token APIs
//!
//! These run with whatever rights the test process has, so privileges that
//! may be missing are checked for either outcome.

#![cfg(windows)]

use privilege_transfer::privilege::names::{SE_CHANGE_NOTIFY_NAME, SE_SECURITY_NAME};
use privilege_transfer::{
    default_elevator, elevate_privilege, ObjectType, PrivilegeElevator, PrivilegeState,
    SecurityDescriptor, SecurityError, SecuritySections, SecurityTarget,
};
use tempfile::NamedTempFile;

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_native_resolution() {
    let elevator = PrivilegeElevator::native();
    let id = elevator.resolve(SE_SECURITY_NAME).unwrap();
    assert_eq!(elevator.resolver().name_of(id).unwrap(), SE_SECURITY_NAME);

    assert!(matches!(
        elevator.resolve("SeTimeTravelPrivilege"),
        Err(SecurityError::UnknownPrivilege(_))
    ));
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_change_notify_always_available() {
    // held by every account
    let scoped = elevate_privilege(SE_CHANGE_NOTIFY_NAME).unwrap();
    assert!(scoped.guard().is_enabled());
    scoped.revert().unwrap();
    assert!(default_elevator().thread_context().is_none());
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_native_elevators_share_thread_context() {
    let own = PrivilegeElevator::native();
    let outer = elevate_privilege(SE_CHANGE_NOTIFY_NAME).unwrap();
    let inner = own.elevate(SE_CHANGE_NOTIFY_NAME).unwrap();
    assert_eq!(own.thread_context(), default_elevator().thread_context());
    assert_eq!(own.thread_reference_count(), 2);

    drop(outer);
    assert_eq!(own.thread_reference_count(), 1);
    inner.revert().unwrap();
    assert!(own.thread_context().is_none());
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_security_privilege_may_be_missing() {
    let elevator = PrivilegeElevator::native();
    let before = elevator.privilege_state(SE_SECURITY_NAME).unwrap();

    match elevator.elevate(SE_SECURITY_NAME) {
        Ok(scoped) => {
            assert_eq!(
                elevator.privilege_state(SE_SECURITY_NAME).unwrap(),
                PrivilegeState::Enabled
            );
            scoped.revert().unwrap();
        }
        Err(SecurityError::PrivilegeNotHeld(name)) => {
            assert_eq!(before, PrivilegeState::NotPresent);
            assert_eq!(name, SE_SECURITY_NAME);
        }
        Err(e) => panic!("unexpected error: {}", e),
    }

    assert_eq!(elevator.privilege_state(SE_SECURITY_NAME).unwrap(), before);
    assert!(elevator.thread_context().is_none());
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_empty_transfer_to_temp_file() {
    let file = NamedTempFile::new().unwrap();
    let target = SecurityTarget::name(file.path().display().to_string());
    let elevator = PrivilegeElevator::native();

    elevator
        .transfer(&target, ObjectType::File, &SecurityDescriptor::new(), SecuritySections::ACCESS)
        .unwrap();
}

#[test]
#[cfg_attr(miri, ignore = "FFI not supported in Miri")]
fn test_transfer_to_missing_file() {
    let elevator = PrivilegeElevator::native();
    let target = SecurityTarget::name("C:\\definitely\\not\\here\\file.txt");
    let descriptor = SecurityDescriptor::new().with_owner("S-1-5-32-544".parse().unwrap());

    let result = elevator.transfer(&target, ObjectType::File, &descriptor, SecuritySections::OWNER);
    assert!(result.is_err());
}
