//! Core module containing fundamental types for privilege-transfer
//!
//! This module provides the foundational building blocks used throughout
//! the crate: privilege identifiers, section sets and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    PrivilegeId,
    RawHandle,
    SecurityError,
    SecurityInformation,
    SecurityResult,
    SecuritySection,
    SecuritySections,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
