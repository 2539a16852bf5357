//! Win32 error codes understood by the privilege and transfer layers
//!
//! The codes are plain `u32` values so the simulated backend can report
//! exactly what the native API would.

use std::fmt;

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_FILE_NOT_FOUND: u32 = 2;
pub const ERROR_PATH_NOT_FOUND: u32 = 3;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_INVALID_HANDLE: u32 = 6;
pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
pub const ERROR_OUTOFMEMORY: u32 = 14;
pub const ERROR_NOT_SUPPORTED: u32 = 50;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
pub const ERROR_INVALID_NAME: u32 = 123;
pub const ERROR_BAD_PATHNAME: u32 = 161;
pub const ERROR_NO_TOKEN: u32 = 1008;
pub const ERROR_NOT_ALL_ASSIGNED: u32 = 1300;
pub const ERROR_NO_SUCH_PRIVILEGE: u32 = 1313;
pub const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;
pub const ERROR_CANT_OPEN_ANONYMOUS: u32 = 1347;
pub const ERROR_NO_SECURITY_ON_OBJECT: u32 = 1350;

/// Win32 error codes with a dedicated meaning in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,
    FileNotFound,
    PathNotFound,
    AccessDenied,
    InvalidHandle,
    NotEnoughMemory,
    OutOfMemory,
    NotSupported,
    InvalidParameter,
    InsufficientBuffer,
    InvalidName,
    BadPathname,
    NoToken,
    NotAllAssigned,
    NoSuchPrivilege,
    PrivilegeNotHeld,
    CantOpenAnonymous,
    NoSecurityOnObject,
    Unknown(u32),
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        match code {
            ERROR_SUCCESS => ErrorCode::Success,
            ERROR_FILE_NOT_FOUND => ErrorCode::FileNotFound,
            ERROR_PATH_NOT_FOUND => ErrorCode::PathNotFound,
            ERROR_ACCESS_DENIED => ErrorCode::AccessDenied,
            ERROR_INVALID_HANDLE => ErrorCode::InvalidHandle,
            ERROR_NOT_ENOUGH_MEMORY => ErrorCode::NotEnoughMemory,
            ERROR_OUTOFMEMORY => ErrorCode::OutOfMemory,
            ERROR_NOT_SUPPORTED => ErrorCode::NotSupported,
            ERROR_INVALID_PARAMETER => ErrorCode::InvalidParameter,
            ERROR_INSUFFICIENT_BUFFER => ErrorCode::InsufficientBuffer,
            ERROR_INVALID_NAME => ErrorCode::InvalidName,
            ERROR_BAD_PATHNAME => ErrorCode::BadPathname,
            ERROR_NO_TOKEN => ErrorCode::NoToken,
            ERROR_NOT_ALL_ASSIGNED => ErrorCode::NotAllAssigned,
            ERROR_NO_SUCH_PRIVILEGE => ErrorCode::NoSuchPrivilege,
            ERROR_PRIVILEGE_NOT_HELD => ErrorCode::PrivilegeNotHeld,
            ERROR_CANT_OPEN_ANONYMOUS => ErrorCode::CantOpenAnonymous,
            ERROR_NO_SECURITY_ON_OBJECT => ErrorCode::NoSecurityOnObject,
            _ => ErrorCode::Unknown(code),
        }
    }
}

impl ErrorCode {
    /// Numeric Win32 value
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::Success => ERROR_SUCCESS,
            ErrorCode::FileNotFound => ERROR_FILE_NOT_FOUND,
            ErrorCode::PathNotFound => ERROR_PATH_NOT_FOUND,
            ErrorCode::AccessDenied => ERROR_ACCESS_DENIED,
            ErrorCode::InvalidHandle => ERROR_INVALID_HANDLE,
            ErrorCode::NotEnoughMemory => ERROR_NOT_ENOUGH_MEMORY,
            ErrorCode::OutOfMemory => ERROR_OUTOFMEMORY,
            ErrorCode::NotSupported => ERROR_NOT_SUPPORTED,
            ErrorCode::InvalidParameter => ERROR_INVALID_PARAMETER,
            ErrorCode::InsufficientBuffer => ERROR_INSUFFICIENT_BUFFER,
            ErrorCode::InvalidName => ERROR_INVALID_NAME,
            ErrorCode::BadPathname => ERROR_BAD_PATHNAME,
            ErrorCode::NoToken => ERROR_NO_TOKEN,
            ErrorCode::NotAllAssigned => ERROR_NOT_ALL_ASSIGNED,
            ErrorCode::NoSuchPrivilege => ERROR_NO_SUCH_PRIVILEGE,
            ErrorCode::PrivilegeNotHeld => ERROR_PRIVILEGE_NOT_HELD,
            ErrorCode::CantOpenAnonymous => ERROR_CANT_OPEN_ANONYMOUS,
            ErrorCode::NoSecurityOnObject => ERROR_NO_SECURITY_ON_OBJECT,
            ErrorCode::Unknown(code) => code,
        }
    }

    /// Allocation failures reported by the OS
    pub fn is_out_of_memory(self) -> bool {
        matches!(self, ErrorCode::NotEnoughMemory | ErrorCode::OutOfMemory)
    }

    /// Codes meaning the name or handle does not designate a usable object
    pub fn is_bad_target(self) -> bool {
        matches!(
            self,
            ErrorCode::FileNotFound
                | ErrorCode::PathNotFound
                | ErrorCode::InvalidHandle
                | ErrorCode::InvalidName
                | ErrorCode::BadPathname
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Success => write!(f, "Success"),
            ErrorCode::FileNotFound => write!(f, "File not found"),
            ErrorCode::PathNotFound => write!(f, "Path not found"),
            ErrorCode::AccessDenied => write!(f, "Access denied"),
            ErrorCode::InvalidHandle => write!(f, "Invalid handle"),
            ErrorCode::NotEnoughMemory => write!(f, "Not enough memory"),
            ErrorCode::OutOfMemory => write!(f, "Out of memory"),
            ErrorCode::NotSupported => write!(f, "Not supported"),
            ErrorCode::InvalidParameter => write!(f, "Invalid parameter"),
            ErrorCode::InsufficientBuffer => write!(f, "Insufficient buffer"),
            ErrorCode::InvalidName => write!(f, "Invalid name"),
            ErrorCode::BadPathname => write!(f, "Bad pathname"),
            ErrorCode::NoToken => write!(f, "No token"),
            ErrorCode::NotAllAssigned => write!(f, "Not all privileges assigned"),
            ErrorCode::NoSuchPrivilege => write!(f, "No such privilege"),
            ErrorCode::PrivilegeNotHeld => write!(f, "Privilege not held"),
            ErrorCode::CantOpenAnonymous => write!(f, "Cannot open anonymous token"),
            ErrorCode::NoSecurityOnObject => write!(f, "No security on object"),
            ErrorCode::Unknown(code) => write!(f, "Unknown error: {}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_conversion() {
        assert_eq!(ErrorCode::from(0), ErrorCode::Success);
        assert_eq!(ErrorCode::from(5), ErrorCode::AccessDenied);
        assert_eq!(ErrorCode::from(1300), ErrorCode::NotAllAssigned);
        assert_eq!(ErrorCode::from(999), ErrorCode::Unknown(999));
    }

    #[test]
    fn test_code_round_trips_through_enum() {
        for code in [0, 2, 3, 5, 6, 8, 14, 50, 87, 122, 123, 161, 1008, 1300, 1313, 1314, 1347, 1350, 4242] {
            assert_eq!(ErrorCode::from(code).code(), code);
        }
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "Success");
        assert_eq!(format!("{}", ErrorCode::AccessDenied), "Access denied");
        assert_eq!(format!("{}", ErrorCode::Unknown(123_456)), "Unknown error: 123456");
    }

    #[test]
    fn test_classification() {
        assert!(ErrorCode::OutOfMemory.is_out_of_memory());
        assert!(ErrorCode::NotEnoughMemory.is_out_of_memory());
        assert!(!ErrorCode::AccessDenied.is_out_of_memory());
        assert!(ErrorCode::InvalidHandle.is_bad_target());
        assert!(ErrorCode::BadPathname.is_bad_target());
        assert!(!ErrorCode::NoToken.is_bad_target());
    }
}
