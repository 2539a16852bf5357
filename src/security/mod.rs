//! Security descriptors and their transfer onto objects

mod descriptor;
mod transfer;
mod view;

pub use descriptor::{Acl, ControlFlags, SecurityDescriptor, Sid};
pub use transfer::{map_transfer_status, SecurityDescriptorTransfer};
pub use view::SecurityDescriptorView;

#[cfg(windows)]
use crate::core::types::{SecurityResult, SecuritySections};
#[cfg(windows)]
use crate::platform::{ObjectType, SecurityTarget};

/// Transfers `requested` sections of `descriptor` to `target` through the
/// process-wide elevator
#[cfg(windows)]
pub fn transfer_security_descriptor(
    target: &SecurityTarget,
    object_type: ObjectType,
    descriptor: &SecurityDescriptor,
    requested: SecuritySections,
) -> SecurityResult<()> {
    crate::privilege::default_elevator().transfer(target, object_type, descriptor, requested)
}
