//! Core type definitions for privilege-transfer
//!
//! This module contains the fundamental types shared by the privilege and
//! security descriptor layers: privilege identifiers, section sets, native
//! security-information flags and the error type.

mod error;
mod privilege_id;
mod sections;

// Re-export all public types
pub use error::{SecurityError, SecurityResult};
pub use privilege_id::PrivilegeId;
pub use sections::{SecurityInformation, SecuritySection, SecuritySections};

/// Raw OS handle value (token, file or kernel object)
pub type RawHandle = isize;
