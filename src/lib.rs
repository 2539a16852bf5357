//! privilege-transfer: thread-scoped privilege elevation and security
//! descriptor transfer for Windows objects
//!
//! A [`PrivilegeElevator`] enables privileges on the calling thread through
//! RAII guards that always restore the previous state, and writes owner,
//! group, DACL and SACL onto files and other objects, enabling the audit
//! privilege around SACL writes. All OS access goes through the
//! [`SecurityApi`] trait: [`NativeSecurityApi`] on Windows,
//! [`SimulatedSecurityApi`] everywhere for tests and tooling.

pub mod config;
pub mod core;
pub mod platform;
pub mod privilege;
pub mod security;
pub mod windows;

pub use crate::core::types::{
    PrivilegeId, RawHandle, SecurityError, SecurityInformation, SecurityResult, SecuritySection,
    SecuritySections,
};
pub use crate::core::{AUTHORS, VERSION};

pub use config::{Config, ConfigError, ConfigLoader};
#[cfg(windows)]
pub use platform::NativeSecurityApi;
pub use platform::{ObjectType, SecurityApi, SecurityTarget, SimulatedSecurityApi};
pub use privilege::{
    ElevationOptions, GuardState, PrivilegeElevator, PrivilegeGuard, PrivilegeNameResolver,
    PrivilegeState, ScopedPrivilege,
};
#[cfg(windows)]
pub use privilege::{default_elevator, elevate_privilege};
pub use security::{Acl, SecurityDescriptor, SecurityDescriptorTransfer, Sid};
#[cfg(windows)]
pub use security::transfer_security_descriptor;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_core_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_error_reexport() {
        let error = SecurityError::UnknownPrivilege("SeNothingPrivilege".to_string());
        assert!(error.to_string().contains("Unknown privilege"));

        let result: SecurityResult<u32> = Ok(42);
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_elevator_over_simulated_backend() {
        let api: Arc<dyn SecurityApi> = Arc::new(SimulatedSecurityApi::new());
        let elevator = PrivilegeElevator::new(api);
        let guard = elevator.guard("SeSecurityPrivilege").unwrap();
        assert_eq!(guard.state(), GuardState::Idle);
        assert_eq!(guard.privilege_id(), PrivilegeId::from_low(8));
    }

    #[test]
    fn test_sections_reexport() {
        let sections = SecuritySections::OWNER | SecuritySections::AUDIT;
        assert!(sections.contains(SecuritySection::Audit));
        assert!(!sections.contains(SecuritySection::Access));
    }
}
