//! Security descriptors and their parts in self-relative binary form
//!
//! Layouts follow the Windows structures byte for byte so the binaries can
//! be handed to the OS unchanged:
//!
//! * SID: revision (1), sub-authority count, 48-bit big-endian identifier
//!   authority, then little-endian `u32` sub-authorities
//! * ACL: revision (2 or 4), padding, `AclSize`, `AceCount`, padding, ACEs
//! * descriptor: revision (1), padding, control word, then offsets of the
//!   owner, group, SACL and DACL relative to the start of the buffer

use crate::core::types::{SecurityError, SecurityResult};
use std::fmt;
use std::str::FromStr;

const SID_REVISION: u8 = 1;
const SID_MAX_SUB_AUTHORITIES: usize = 15;
const SID_HEADER_LEN: usize = 8;

const ACL_REVISION: u8 = 2;
const ACL_REVISION_DS: u8 = 4;
const ACL_HEADER_LEN: usize = 8;

const DESCRIPTOR_REVISION: u8 = 1;
const DESCRIPTOR_HEADER_LEN: usize = 20;

const OWNER_OFFSET_AT: usize = 4;
const GROUP_OFFSET_AT: usize = 8;
const SACL_OFFSET_AT: usize = 12;
const DACL_OFFSET_AT: usize = 16;

fn invalid(reason: impl Into<String>) -> SecurityError {
    SecurityError::InvalidDescriptor(reason.into())
}

fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Security identifier in its binary form
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sid(Vec<u8>);

impl Sid {
    /// Builds a SID from its identifier authority (48 bits) and
    /// sub-authorities
    pub fn new(authority: u64, sub_authorities: &[u32]) -> SecurityResult<Self> {
        if authority >> 48 != 0 {
            return Err(invalid(format!("identifier authority {:#x} exceeds 48 bits", authority)));
        }
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(invalid(format!(
                "{} sub-authorities, at most {} allowed",
                sub_authorities.len(),
                SID_MAX_SUB_AUTHORITIES
            )));
        }

        let mut bytes = Vec::with_capacity(SID_HEADER_LEN + 4 * sub_authorities.len());
        bytes.push(SID_REVISION);
        bytes.push(sub_authorities.len() as u8);
        bytes.extend_from_slice(&authority.to_be_bytes()[2..]);
        for sub in sub_authorities {
            bytes.extend_from_slice(&sub.to_le_bytes());
        }
        Ok(Sid(bytes))
    }

    /// Parses a SID occupying exactly `bytes`
    pub fn from_bytes(bytes: &[u8]) -> SecurityResult<Self> {
        let sid = Self::parse_prefix(bytes)?;
        if sid.0.len() != bytes.len() {
            return Err(invalid(format!(
                "SID is {} bytes, buffer has {}",
                sid.0.len(),
                bytes.len()
            )));
        }
        Ok(sid)
    }

    // Parses the SID at the start of `bytes`, ignoring anything after it
    fn parse_prefix(bytes: &[u8]) -> SecurityResult<Self> {
        let header = bytes
            .get(..SID_HEADER_LEN)
            .ok_or_else(|| invalid("SID shorter than its header"))?;
        if header[0] != SID_REVISION {
            return Err(invalid(format!("unsupported SID revision {}", header[0])));
        }
        let count = header[1] as usize;
        if count > SID_MAX_SUB_AUTHORITIES {
            return Err(invalid(format!("SID claims {} sub-authorities", count)));
        }
        let len = SID_HEADER_LEN + 4 * count;
        let body = bytes
            .get(..len)
            .ok_or_else(|| invalid("SID truncated"))?;
        Ok(Sid(body.to_vec()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn authority(&self) -> u64 {
        self.0[2..SID_HEADER_LEN]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }

    pub fn sub_authorities(&self) -> Vec<u32> {
        self.0[SID_HEADER_LEN..]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authority = self.authority();
        if authority >> 32 == 0 {
            write!(f, "S-{}-{}", self.0[0], authority)?;
        } else {
            write!(f, "S-{}-0x{:012X}", self.0[0], authority)?;
        }
        for sub in self.sub_authorities() {
            write!(f, "-{}", sub)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({})", self)
    }
}

impl FromStr for Sid {
    type Err = SecurityError;

    /// Parses the `S-1-<authority>-<sub>...` string form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        if !parts.next().is_some_and(|p| p.eq_ignore_ascii_case("S")) {
            return Err(invalid(format!("'{}' does not start with S-", s)));
        }
        if parts.next() != Some("1") {
            return Err(invalid(format!("'{}' is not a revision 1 SID", s)));
        }
        let authority = match parts.next() {
            Some(digits) if digits.starts_with("0x") || digits.starts_with("0X") => {
                u64::from_str_radix(&digits[2..], 16).ok()
            }
            Some(dec) => dec.parse::<u64>().ok(),
            None => None,
        }
        .ok_or_else(|| invalid(format!("'{}' has no valid identifier authority", s)))?;

        let subs = parts
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(format!("'{}': {}", s, e)))?;
        Sid::new(authority, &subs)
    }
}

/// Access control list in its binary form
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Acl(Vec<u8>);

impl Acl {
    pub const ACCESS_ALLOWED_ACE_TYPE: u8 = 0;
    pub const ACCESS_DENIED_ACE_TYPE: u8 = 1;
    pub const SYSTEM_AUDIT_ACE_TYPE: u8 = 2;

    pub const SUCCESSFUL_ACCESS_ACE_FLAG: u8 = 0x40;
    pub const FAILED_ACCESS_ACE_FLAG: u8 = 0x80;

    /// An ACL with no entries
    pub fn empty() -> Self {
        let mut bytes = vec![0u8; ACL_HEADER_LEN];
        bytes[0] = ACL_REVISION;
        bytes[2..4].copy_from_slice(&(ACL_HEADER_LEN as u16).to_le_bytes());
        Acl(bytes)
    }

    /// Parses an ACL whose `AclSize` equals the buffer length
    pub fn from_bytes(bytes: &[u8]) -> SecurityResult<Self> {
        let acl = Self::parse_prefix(bytes)?;
        if acl.0.len() != bytes.len() {
            return Err(invalid(format!(
                "ACL size {} does not match buffer length {}",
                acl.0.len(),
                bytes.len()
            )));
        }
        Ok(acl)
    }

    fn parse_prefix(bytes: &[u8]) -> SecurityResult<Self> {
        let revision = *bytes.first().ok_or_else(|| invalid("empty ACL"))?;
        if revision != ACL_REVISION && revision != ACL_REVISION_DS {
            return Err(invalid(format!("unsupported ACL revision {}", revision)));
        }
        let size = read_u16(bytes, 2).ok_or_else(|| invalid("ACL shorter than its header"))? as usize;
        if size < ACL_HEADER_LEN {
            return Err(invalid(format!("ACL size {} below header size", size)));
        }
        let body = bytes
            .get(..size)
            .ok_or_else(|| invalid(format!("ACL claims {} bytes, {} available", size, bytes.len())))?;
        Ok(Acl(body.to_vec()))
    }

    pub fn revision(&self) -> u8 {
        self.0[0]
    }

    pub fn ace_count(&self) -> u16 {
        read_u16(&self.0, 4).unwrap_or(0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the ACL has no entries
    pub fn is_empty(&self) -> bool {
        self.ace_count() == 0
    }

    pub fn push_access_allowed(&mut self, mask: u32, sid: &Sid) -> SecurityResult<()> {
        self.push_ace(Self::ACCESS_ALLOWED_ACE_TYPE, 0, mask, sid)
    }

    pub fn push_access_denied(&mut self, mask: u32, sid: &Sid) -> SecurityResult<()> {
        self.push_ace(Self::ACCESS_DENIED_ACE_TYPE, 0, mask, sid)
    }

    /// Audit entry; `flags` selects success and/or failure auditing
    pub fn push_system_audit(&mut self, mask: u32, sid: &Sid, flags: u8) -> SecurityResult<()> {
        self.push_ace(Self::SYSTEM_AUDIT_ACE_TYPE, flags, mask, sid)
    }

    // Fails without modifying the ACL when the entry would not fit the
    // 16-bit size or count fields
    fn push_ace(&mut self, ace_type: u8, flags: u8, mask: u32, sid: &Sid) -> SecurityResult<()> {
        let ace_len = 4 + 4 + sid.len();
        let ace_size = u16::try_from(ace_len)
            .map_err(|_| invalid(format!("ACE of {} bytes is too large", ace_len)))?;
        let size = u16::try_from(self.0.len() + ace_len).map_err(|_| {
            invalid(format!(
                "ACL would grow to {} bytes, limit is {}",
                self.0.len() + ace_len,
                u16::MAX
            ))
        })?;
        let count = self
            .ace_count()
            .checked_add(1)
            .ok_or_else(|| invalid("ACL entry count overflow"))?;

        self.0.push(ace_type);
        self.0.push(flags);
        self.0.extend_from_slice(&ace_size.to_le_bytes());
        self.0.extend_from_slice(&mask.to_le_bytes());
        self.0.extend_from_slice(sid.as_bytes());
        self.0[2..4].copy_from_slice(&size.to_le_bytes());
        self.0[4..6].copy_from_slice(&count.to_le_bytes());
        Ok(())
    }
}

impl Default for Acl {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acl")
            .field("revision", &self.revision())
            .field("aces", &self.ace_count())
            .field("bytes", &hex::encode(&self.0))
            .finish()
    }
}

/// Security descriptor control word (`SECURITY_DESCRIPTOR_CONTROL`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControlFlags(pub u16);

impl ControlFlags {
    pub const OWNER_DEFAULTED: u16 = 0x0001;
    pub const GROUP_DEFAULTED: u16 = 0x0002;
    pub const DACL_PRESENT: u16 = 0x0004;
    pub const DACL_DEFAULTED: u16 = 0x0008;
    pub const SACL_PRESENT: u16 = 0x0010;
    pub const SACL_DEFAULTED: u16 = 0x0020;
    pub const DACL_AUTO_INHERITED: u16 = 0x0400;
    pub const SACL_AUTO_INHERITED: u16 = 0x0800;
    pub const DACL_PROTECTED: u16 = 0x1000;
    pub const SACL_PROTECTED: u16 = 0x2000;
    pub const SELF_RELATIVE: u16 = 0x8000;

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub const fn contains(&self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    pub fn set(&mut self, flag: u16, on: bool) {
        if on {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }
}

impl fmt::Display for ControlFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// A security descriptor: owner, group, DACL, SACL and control flags.
///
/// A DACL can be present yet null (`dacl_present()` with no `dacl()`),
/// which grants everyone full access; an absent DACL is left untouched by a
/// transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecurityDescriptor {
    control: ControlFlags,
    owner: Option<Sid>,
    group: Option<Sid>,
    dacl: Option<Acl>,
    sacl: Option<Acl>,
}

impl SecurityDescriptor {
    pub fn new() -> Self {
        SecurityDescriptor {
            control: ControlFlags(ControlFlags::SELF_RELATIVE),
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, owner: Sid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_group(mut self, group: Sid) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_dacl(mut self, dacl: Acl, protected: bool) -> Self {
        self.dacl = Some(dacl);
        self.control.set(ControlFlags::DACL_PRESENT, true);
        self.control.set(ControlFlags::DACL_PROTECTED, protected);
        self
    }

    /// Marks the DACL present without an ACL
    pub fn with_null_dacl(mut self) -> Self {
        self.dacl = None;
        self.control.set(ControlFlags::DACL_PRESENT, true);
        self
    }

    pub fn with_sacl(mut self, sacl: Acl, protected: bool) -> Self {
        self.sacl = Some(sacl);
        self.control.set(ControlFlags::SACL_PRESENT, true);
        self.control.set(ControlFlags::SACL_PROTECTED, protected);
        self
    }

    pub fn set_dacl_protected(&mut self, protected: bool) {
        self.control.set(ControlFlags::DACL_PROTECTED, protected);
    }

    pub fn set_sacl_protected(&mut self, protected: bool) {
        self.control.set(ControlFlags::SACL_PROTECTED, protected);
    }

    pub fn control(&self) -> ControlFlags {
        self.control
    }

    pub fn owner(&self) -> Option<&Sid> {
        self.owner.as_ref()
    }

    pub fn group(&self) -> Option<&Sid> {
        self.group.as_ref()
    }

    pub fn dacl(&self) -> Option<&Acl> {
        self.dacl.as_ref()
    }

    pub fn sacl(&self) -> Option<&Acl> {
        self.sacl.as_ref()
    }

    pub fn dacl_present(&self) -> bool {
        self.control.contains(ControlFlags::DACL_PRESENT)
    }

    pub fn dacl_protected(&self) -> bool {
        self.control.contains(ControlFlags::DACL_PROTECTED)
    }

    pub fn sacl_protected(&self) -> bool {
        self.control.contains(ControlFlags::SACL_PROTECTED)
    }

    /// Parses a self-relative security descriptor
    pub fn from_bytes(bytes: &[u8]) -> SecurityResult<Self> {
        let header = bytes
            .get(..DESCRIPTOR_HEADER_LEN)
            .ok_or_else(|| invalid(format!("descriptor of {} bytes has no header", bytes.len())))?;
        if header[0] != DESCRIPTOR_REVISION {
            return Err(invalid(format!("unsupported descriptor revision {}", header[0])));
        }
        let control = ControlFlags(read_u16(header, 2).unwrap_or(0));
        if !control.contains(ControlFlags::SELF_RELATIVE) {
            return Err(invalid("descriptor is not self-relative"));
        }

        let owner = section(bytes, OWNER_OFFSET_AT, Sid::parse_prefix)?;
        let group = section(bytes, GROUP_OFFSET_AT, Sid::parse_prefix)?;
        let sacl = if control.contains(ControlFlags::SACL_PRESENT) {
            section(bytes, SACL_OFFSET_AT, Acl::parse_prefix)?
        } else {
            None
        };
        let dacl = if control.contains(ControlFlags::DACL_PRESENT) {
            section(bytes, DACL_OFFSET_AT, Acl::parse_prefix)?
        } else {
            None
        };

        Ok(SecurityDescriptor {
            control,
            owner,
            group,
            dacl,
            sacl,
        })
    }

    /// Serializes to the self-relative form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut control = self.control;
        control.set(ControlFlags::SELF_RELATIVE, true);
        if self.sacl.is_some() {
            control.set(ControlFlags::SACL_PRESENT, true);
        }
        if self.dacl.is_some() {
            control.set(ControlFlags::DACL_PRESENT, true);
        }

        let mut out = vec![0u8; DESCRIPTOR_HEADER_LEN];
        out[0] = DESCRIPTOR_REVISION;
        out[2..4].copy_from_slice(&control.bits().to_le_bytes());
        append_section(&mut out, OWNER_OFFSET_AT, self.owner.as_ref().map(Sid::as_bytes));
        append_section(&mut out, GROUP_OFFSET_AT, self.group.as_ref().map(Sid::as_bytes));
        append_section(&mut out, SACL_OFFSET_AT, self.sacl.as_ref().map(Acl::as_bytes));
        append_section(&mut out, DACL_OFFSET_AT, self.dacl.as_ref().map(Acl::as_bytes));
        out
    }
}

fn section<T>(
    bytes: &[u8],
    offset_at: usize,
    parse: impl FnOnce(&[u8]) -> SecurityResult<T>,
) -> SecurityResult<Option<T>> {
    let offset = read_u32(bytes, offset_at).unwrap_or(0) as usize;
    if offset == 0 {
        return Ok(None);
    }
    if offset < DESCRIPTOR_HEADER_LEN {
        return Err(invalid(format!("section offset {} points into the header", offset)));
    }
    let body = bytes
        .get(offset..)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| invalid(format!("section offset {} beyond {} bytes", offset, bytes.len())))?;
    parse(body).map(Some)
}

fn append_section(out: &mut Vec<u8>, offset_at: usize, data: Option<&[u8]>) {
    if let Some(data) = data {
        let offset = out.len() as u32;
        out[offset_at..offset_at + 4].copy_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(data);
    }
}
