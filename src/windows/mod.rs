//! Windows API layer
//!
//! Win32 error codes are available on every platform so the simulated
//! backend reports exactly what the native one would. The FFI wrappers
//! exist only on Windows; all unsafe calls are contained in
//! [`bindings`].

#[cfg(windows)]
pub mod bindings;
pub mod utils;

pub use utils::ErrorCode;

/// Whether the native security API is available on this build
pub const fn is_native_supported() -> bool {
    cfg!(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_support_matches_target() {
        #[cfg(windows)]
        assert!(is_native_supported());

        #[cfg(not(windows))]
        assert!(!is_native_supported());
    }
}
