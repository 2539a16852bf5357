//! Custom error types for privilege elevation and descriptor transfer

use crate::windows::utils::error_codes::ErrorCode;
use thiserror::Error;

/// Main error type for privilege and security descriptor operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Unknown privilege: {0}")]
    UnknownPrivilege(String),

    #[error("Privilege not held: {0}")]
    PrivilegeNotHeld(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Privilege guard used off its owning thread: {0}")]
    WrongThread(String),

    #[error("Privilege guard already active: {0}")]
    AlreadyActive(String),

    #[error("OS failure {code}: {context}")]
    GenericOsFailure { code: u32, context: String },

    #[error("Invalid security descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;

impl SecurityError {
    /// Maps a raw Win32 code to the error kinds shared by every OS call.
    ///
    /// Privilege-specific codes (`ERROR_NO_SUCH_PRIVILEGE`,
    /// `ERROR_NOT_ALL_ASSIGNED`) are classified by the callers that know
    /// which privilege name is involved.
    pub fn from_os_code(code: u32, context: impl Into<String>) -> Self {
        let context = context.into();
        let kind = ErrorCode::from(code);
        if kind.is_out_of_memory() {
            SecurityError::InsufficientResources(context)
        } else if kind == ErrorCode::AccessDenied {
            SecurityError::AccessDenied(context)
        } else {
            SecurityError::GenericOsFailure { code, context }
        }
    }

    /// Creates a generic OS failure carrying the native code
    pub fn os_failure(code: u32, context: impl Into<String>) -> Self {
        SecurityError::GenericOsFailure {
            code,
            context: context.into(),
        }
    }

    /// Caller misuse that must never be retried
    pub fn is_programming_fault(&self) -> bool {
        matches!(
            self,
            SecurityError::WrongThread(_) | SecurityError::AlreadyActive(_)
        )
    }

    /// Native code carried by a generic OS failure
    pub fn os_code(&self) -> Option<u32> {
        match self {
            SecurityError::GenericOsFailure { code, .. } => Some(*code),
            _ => None,
        }
    }
}
