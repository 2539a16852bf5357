//! Access-control section sets and the native security-information word

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};

/// One section of an object's access-control state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecuritySection {
    Owner,
    Group,
    Access,
    Audit,
}

impl SecuritySection {
    pub const ALL: [SecuritySection; 4] = [
        SecuritySection::Owner,
        SecuritySection::Group,
        SecuritySection::Access,
        SecuritySection::Audit,
    ];

    const fn bit(self) -> u8 {
        match self {
            SecuritySection::Owner => 0x1,
            SecuritySection::Group => 0x2,
            SecuritySection::Access => 0x4,
            SecuritySection::Audit => 0x8,
        }
    }
}

impl fmt::Display for SecuritySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecuritySection::Owner => write!(f, "Owner"),
            SecuritySection::Group => write!(f, "Group"),
            SecuritySection::Access => write!(f, "Access"),
            SecuritySection::Audit => write!(f, "Audit"),
        }
    }
}

/// Set of [`SecuritySection`]s requested by a caller or present in a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SecuritySections(u8);

impl SecuritySections {
    pub const NONE: SecuritySections = SecuritySections(0);
    pub const OWNER: SecuritySections = SecuritySections(0x1);
    pub const GROUP: SecuritySections = SecuritySections(0x2);
    pub const ACCESS: SecuritySections = SecuritySections(0x4);
    pub const AUDIT: SecuritySections = SecuritySections(0x8);
    pub const ALL: SecuritySections = SecuritySections(0xF);

    /// Raw bit value
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Builds a set from raw bits, ignoring unknown bits
    pub const fn from_bits_truncate(bits: u8) -> Self {
        SecuritySections(bits & Self::ALL.0)
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn contains(&self, section: SecuritySection) -> bool {
        self.0 & section.bit() != 0
    }

    pub fn insert(&mut self, section: SecuritySection) {
        self.0 |= section.bit();
    }

    pub fn remove(&mut self, section: SecuritySection) {
        self.0 &= !section.bit();
    }

    /// Iterates the contained sections in Owner, Group, Access, Audit order
    pub fn iter(&self) -> impl Iterator<Item = SecuritySection> + '_ {
        SecuritySection::ALL
            .into_iter()
            .filter(move |section| self.contains(*section))
    }
}

impl From<SecuritySection> for SecuritySections {
    fn from(section: SecuritySection) -> Self {
        SecuritySections(section.bit())
    }
}

impl FromIterator<SecuritySection> for SecuritySections {
    fn from_iter<I: IntoIterator<Item = SecuritySection>>(iter: I) -> Self {
        let mut sections = SecuritySections::NONE;
        for section in iter {
            sections.insert(section);
        }
        sections
    }
}

impl BitOr for SecuritySections {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        SecuritySections(self.0 | rhs.0)
    }
}

impl BitOrAssign for SecuritySections {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SecuritySections {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        SecuritySections(self.0 & rhs.0)
    }
}

impl Sub for SecuritySections {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        SecuritySections(self.0 & !rhs.0)
    }
}

impl fmt::Display for SecuritySections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let names: Vec<String> = self.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Native `SECURITY_INFORMATION` flag word passed to the set-security call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SecurityInformation(pub u32);

impl SecurityInformation {
    pub const OWNER: u32 = 0x0000_0001;
    pub const GROUP: u32 = 0x0000_0002;
    pub const DACL: u32 = 0x0000_0004;
    pub const SACL: u32 = 0x0000_0008;
    pub const UNPROTECTED_SACL: u32 = 0x1000_0000;
    pub const UNPROTECTED_DACL: u32 = 0x2000_0000;
    pub const PROTECTED_SACL: u32 = 0x4000_0000;
    pub const PROTECTED_DACL: u32 = 0x8000_0000;

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn has(&self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    /// Sections named by the flag word, ignoring protection bits
    pub fn sections(&self) -> SecuritySections {
        let mut sections = SecuritySections::NONE;
        if self.has(Self::OWNER) {
            sections.insert(SecuritySection::Owner);
        }
        if self.has(Self::GROUP) {
            sections.insert(SecuritySection::Group);
        }
        if self.has(Self::DACL) {
            sections.insert(SecuritySection::Access);
        }
        if self.has(Self::SACL) {
            sections.insert(SecuritySection::Audit);
        }
        sections
    }
}

impl fmt::Display for SecurityInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
