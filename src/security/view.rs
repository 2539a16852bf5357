//! Per-call extraction of the sections a transfer will write

use super::descriptor::{Acl, SecurityDescriptor, Sid};
use crate::core::types::{SecurityInformation, SecuritySection, SecuritySections};
use crate::platform::SetSecurityRequest;

/// The parts of a descriptor selected for one transfer, with the native
/// flags that go with them. Built fresh per call and never retained.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityDescriptorView {
    pub owner: Option<Sid>,
    pub group: Option<Sid>,
    /// `None` with Access selected writes a null DACL
    pub dacl: Option<Acl>,
    pub dacl_protected: bool,
    pub sacl: Option<Acl>,
    pub sacl_protected: bool,
    pub sections_present: SecuritySections,
}

impl SecurityDescriptorView {
    /// Selects sections from `descriptor` that `requested` asks for.
    ///
    /// Owner and group need a SID. Access needs the DACL-present control
    /// flag. Audit is always taken when requested: without a SACL an empty
    /// one is written so the protection flag still reaches the object.
    pub fn extract(descriptor: &SecurityDescriptor, requested: SecuritySections) -> Self {
        let mut view = SecurityDescriptorView::default();

        if requested.contains(SecuritySection::Owner) {
            if let Some(owner) = descriptor.owner() {
                view.owner = Some(owner.clone());
                view.sections_present.insert(SecuritySection::Owner);
            }
        }
        if requested.contains(SecuritySection::Group) {
            if let Some(group) = descriptor.group() {
                view.group = Some(group.clone());
                view.sections_present.insert(SecuritySection::Group);
            }
        }
        if requested.contains(SecuritySection::Access) && descriptor.dacl_present() {
            view.dacl = descriptor.dacl().cloned();
            view.dacl_protected = descriptor.dacl_protected();
            view.sections_present.insert(SecuritySection::Access);
        }
        if requested.contains(SecuritySection::Audit) {
            view.sacl = Some(descriptor.sacl().cloned().unwrap_or_else(Acl::empty));
            view.sacl_protected = descriptor.sacl_protected();
            view.sections_present.insert(SecuritySection::Audit);
        }

        view
    }

    pub fn includes(&self, section: SecuritySection) -> bool {
        self.sections_present.contains(section)
    }

    pub fn is_empty(&self) -> bool {
        self.sections_present.is_empty()
    }

    /// Removes the audit section: its flag, protection flag and SACL
    pub fn drop_audit(&mut self) {
        self.sections_present.remove(SecuritySection::Audit);
        self.sacl = None;
        self.sacl_protected = false;
    }

    /// Native `SECURITY_INFORMATION` for the selected sections
    pub fn security_information(&self) -> SecurityInformation {
        let mut info = SecurityInformation::default();
        if self.includes(SecuritySection::Owner) {
            info.set(SecurityInformation::OWNER);
        }
        if self.includes(SecuritySection::Group) {
            info.set(SecurityInformation::GROUP);
        }
        if self.includes(SecuritySection::Access) {
            info.set(SecurityInformation::DACL);
            info.set(if self.dacl_protected {
                SecurityInformation::PROTECTED_DACL
            } else {
                SecurityInformation::UNPROTECTED_DACL
            });
        }
        if self.includes(SecuritySection::Audit) {
            info.set(SecurityInformation::SACL);
            info.set(if self.sacl_protected {
                SecurityInformation::PROTECTED_SACL
            } else {
                SecurityInformation::UNPROTECTED_SACL
            });
        }
        info
    }

    /// Arguments for the native call
    pub fn request(&self) -> SetSecurityRequest<'_> {
        SetSecurityRequest {
            information: self.security_information(),
            owner: self.owner.as_ref().map(Sid::as_bytes),
            group: self.group.as_ref().map(Sid::as_bytes),
            dacl: self.dacl.as_ref().map(Acl::as_bytes),
            sacl: self.sacl.as_ref().map(Acl::as_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> Sid {
        s.parse().unwrap()
    }

    fn full_descriptor() -> SecurityDescriptor {
        let mut dacl = Acl::empty();
        dacl.push_access_allowed(0x1200A9, &sid("S-1-5-11")).unwrap();
        SecurityDescriptor::new()
            .with_owner(sid("S-1-5-32-544"))
            .with_group(sid("S-1-5-18"))
            .with_dacl(dacl, true)
    }

    #[test]
    fn test_extract_all_requested() {
        let view = SecurityDescriptorView::extract(&full_descriptor(), SecuritySections::ALL);
        assert_eq!(view.sections_present, SecuritySections::ALL);
        assert!(view.dacl_protected);
        // no SACL on the descriptor, audit still selected with an empty one
        assert_eq!(view.sacl, Some(Acl::empty()));

        let info = view.security_information();
        assert!(info.has(SecurityInformation::OWNER));
        assert!(info.has(SecurityInformation::GROUP));
        assert!(info.has(SecurityInformation::DACL | SecurityInformation::PROTECTED_DACL));
        assert!(info.has(SecurityInformation::SACL | SecurityInformation::UNPROTECTED_SACL));
        assert!(!info.has(SecurityInformation::UNPROTECTED_DACL));
    }

    #[test]
    fn test_extract_respects_request() {
        let view = SecurityDescriptorView::extract(&full_descriptor(), SecuritySections::OWNER);
        assert_eq!(view.sections_present, SecuritySections::OWNER);
        assert!(view.group.is_none());
        assert!(view.dacl.is_none());
        assert_eq!(view.security_information().bits(), SecurityInformation::OWNER);
    }

    #[test]
    fn test_access_requires_dacl_present() {
        let descriptor = SecurityDescriptor::new().with_owner(sid("S-1-5-18"));
        let view = SecurityDescriptorView::extract(&descriptor, SecuritySections::ACCESS);
        assert!(view.is_empty());
    }

    #[test]
    fn test_null_dacl_is_selected() {
        let descriptor = SecurityDescriptor::new().with_null_dacl();
        let view = SecurityDescriptorView::extract(&descriptor, SecuritySections::ACCESS);
        assert!(view.includes(SecuritySection::Access));
        assert!(view.request().dacl.is_none());
        assert!(view
            .security_information()
            .has(SecurityInformation::UNPROTECTED_DACL));
    }

    #[test]
    fn test_drop_audit() {
        let mut descriptor = full_descriptor();
        descriptor.set_sacl_protected(true);
        let mut view = SecurityDescriptorView::extract(&descriptor, SecuritySections::ALL);
        assert!(view.security_information().has(SecurityInformation::PROTECTED_SACL));

        view.drop_audit();
        let info = view.security_information();
        assert!(!info.has(SecurityInformation::SACL));
        assert!(!info.has(SecurityInformation::PROTECTED_SACL));
        assert!(view.request().sacl.is_none());
        assert_eq!(
            view.sections_present,
            SecuritySections::OWNER | SecuritySections::GROUP | SecuritySections::ACCESS
        );
    }
}
