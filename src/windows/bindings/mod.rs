//! Windows API bindings
//!
//! Low-level FFI wrappers around the Windows security API.

pub mod advapi32;

pub use advapi32::win32_code;
