//! Applying a security descriptor to an object

use super::descriptor::SecurityDescriptor;
use super::view::SecurityDescriptorView;
use crate::core::types::{SecurityError, SecurityResult, SecuritySection, SecuritySections};
use crate::platform::{ObjectType, OsCode, SecurityTarget};
use crate::privilege::{PrivilegeElevator, PrivilegeGuard};
use crate::windows::utils::error_codes::ErrorCode;
use tracing::{debug, trace, warn};

/// Writes selected sections of a descriptor to an object in one native
/// call, enabling the audit privilege around SACL writes.
#[derive(Debug, Clone, Copy)]
pub struct SecurityDescriptorTransfer<'a> {
    elevator: &'a PrivilegeElevator,
}

impl<'a> SecurityDescriptorTransfer<'a> {
    pub fn new(elevator: &'a PrivilegeElevator) -> Self {
        SecurityDescriptorTransfer { elevator }
    }

    /// Applies the `requested` sections of `descriptor` to `target`.
    ///
    /// If the audit privilege is not held the audit section is dropped and
    /// the remaining sections are still written. Any other failure to
    /// enable it aborts the transfer.
    pub fn apply(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        descriptor: &SecurityDescriptor,
        requested: SecuritySections,
    ) -> SecurityResult<()> {
        let mut view = SecurityDescriptorView::extract(descriptor, requested);
        debug!(
            %target,
            ?object_type,
            %requested,
            selected = %view.sections_present,
            "transferring security descriptor"
        );

        let audit_privilege = &self.elevator.options().audit_privilege;
        let mut audit_guard = None;
        if view.includes(SecuritySection::Audit) {
            let mut guard = self.elevator.guard(audit_privilege)?;
            match guard.enable() {
                Ok(()) => audit_guard = Some(guard),
                Err(SecurityError::PrivilegeNotHeld(name)) => {
                    warn!(
                        privilege = %name,
                        %target,
                        "audit privilege not held; transferring without the audit section"
                    );
                    view.drop_audit();
                }
                Err(e) => return Err(e),
            }
        }

        if view.is_empty() {
            debug!(%target, "no sections to transfer");
            return revert_audit(audit_guard);
        }

        let request = view.request();
        trace!(
            information = %request.information,
            owner = ?request.owner.map(hex::encode),
            group = ?request.group.map(hex::encode),
            dacl = ?request.dacl.map(hex::encode),
            sacl = ?request.sacl.map(hex::encode),
            "set security info"
        );
        let status = self
            .elevator
            .api()
            .set_security_info(target, object_type, &request);

        let reverted = revert_audit(audit_guard);
        map_transfer_status(status, view.sections_present, target, audit_privilege)?;
        reverted
    }

    /// Like [`apply`](Self::apply), with the descriptor in self-relative
    /// binary form
    pub fn apply_binary(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        descriptor: &[u8],
        requested: SecuritySections,
    ) -> SecurityResult<()> {
        let descriptor = SecurityDescriptor::from_bytes(descriptor)?;
        self.apply(target, object_type, &descriptor, requested)
    }
}

fn revert_audit(guard: Option<PrivilegeGuard>) -> SecurityResult<()> {
    match guard {
        Some(mut guard) => guard.revert(),
        None => Ok(()),
    }
}

/// Maps the status of a set-security call to a result.
///
/// "No security on object" is success when nothing was asked to be
/// written. A missing privilege is named as the audit privilege only when
/// the audit section was part of the call.
pub fn map_transfer_status(
    status: OsCode,
    sections: SecuritySections,
    target: &SecurityTarget,
    audit_privilege: &str,
) -> SecurityResult<()> {
    let code = ErrorCode::from(status);
    match code {
        ErrorCode::Success => Ok(()),
        ErrorCode::NoSecurityOnObject if sections.is_empty() => Ok(()),
        ErrorCode::NotAllAssigned | ErrorCode::PrivilegeNotHeld
            if sections.contains(SecuritySection::Audit) =>
        {
            Err(SecurityError::PrivilegeNotHeld(audit_privilege.to_string()))
        }
        ErrorCode::NotAllAssigned | ErrorCode::PrivilegeNotHeld => Err(
            SecurityError::PrivilegeNotHeld(format!("writing {} on {}", sections, target)),
        ),
        ErrorCode::AccessDenied | ErrorCode::CantOpenAnonymous => {
            Err(SecurityError::AccessDenied(target.to_string()))
        }
        c if c.is_out_of_memory() => Err(SecurityError::InsufficientResources(format!(
            "setting security on {}",
            target
        ))),
        c if c.is_bad_target() => Err(SecurityError::InvalidTarget(target.to_string())),
        _ => Err(SecurityError::GenericOsFailure {
            code: status,
            context: format!("setting security on {}", target),
        }),
    }
}

impl PrivilegeElevator {
    /// Transfers `requested` sections of `descriptor` to `target`
    pub fn transfer(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        descriptor: &SecurityDescriptor,
        requested: SecuritySections,
    ) -> SecurityResult<()> {
        SecurityDescriptorTransfer::new(self).apply(target, object_type, descriptor, requested)
    }
}
