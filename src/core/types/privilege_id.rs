//! Opaque privilege identifier (LUID equivalent)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a privilege on the local system.
///
/// Values are only meaningful for the backend that produced them; the
/// resolver caches them for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrivilegeId {
    pub low: u32,
    pub high: i32,
}

impl PrivilegeId {
    /// Creates an identifier from its two LUID halves
    pub const fn new(low: u32, high: i32) -> Self {
        PrivilegeId { low, high }
    }

    /// Creates an identifier with a zero high part, the common case for
    /// well-known privileges
    pub const fn from_low(low: u32) -> Self {
        PrivilegeId { low, high: 0 }
    }

    /// Packs both halves into a single 64-bit value
    pub const fn as_u64(&self) -> u64 {
        ((self.high as u32 as u64) << 32) | self.low as u64
    }
}

impl From<u64> for PrivilegeId {
    fn from(value: u64) -> Self {
        PrivilegeId {
            low: value as u32,
            high: (value >> 32) as u32 as i32,
        }
    }
}

impl fmt::Display for PrivilegeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}:{:#x}", self.high, self.low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_id_packing() {
        let id = PrivilegeId::new(8, 0);
        assert_eq!(id.as_u64(), 8);
        assert_eq!(PrivilegeId::from(8u64), id);

        let wide = PrivilegeId::new(0xDEAD_BEEF, 7);
        assert_eq!(PrivilegeId::from(wide.as_u64()), wide);
    }

    #[test]
    fn test_negative_high_part_survives_packing() {
        let id = PrivilegeId::new(1, -1);
        assert_eq!(PrivilegeId::from(id.as_u64()), id);
    }

    #[test]
    fn test_privilege_id_display() {
        assert_eq!(PrivilegeId::from_low(20).to_string(), "0x0:0x14");
    }
}
