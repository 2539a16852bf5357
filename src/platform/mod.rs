//! OS security API seam
//!
//! Every primitive the privilege and transfer layers need from the operating
//! system goes through [`SecurityApi`]. Failures are reported as raw Win32
//! codes; classification into [`SecurityError`](crate::SecurityError) happens
//! in the caller, which knows what was being attempted.

#[cfg(windows)]
mod native;
mod simulated;

#[cfg(windows)]
pub use native::NativeSecurityApi;
pub use simulated::{RecordedSetSecurity, SimulatedOp, SimulatedSecurityApi};

use crate::core::types::{PrivilegeId, RawHandle, SecurityInformation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw Win32 error code
pub type OsCode = u32;

/// Result of a single OS primitive
pub type OsResult<T> = Result<T, OsCode>;

/// Token handle owned by whoever opened it
pub type TokenHandle = RawHandle;

/// Outcome of adjusting one privilege on a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustOutcome {
    /// Enabled state before the adjustment
    pub previous_enabled: bool,
    /// The token does not hold the privilege at all; nothing was changed
    pub not_all_assigned: bool,
}

/// Object whose security is being set, by name or by open handle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityTarget {
    Name(String),
    Handle(RawHandle),
}

impl SecurityTarget {
    pub fn name(name: impl Into<String>) -> Self {
        SecurityTarget::Name(name.into())
    }
}

impl fmt::Display for SecurityTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityTarget::Name(name) => write!(f, "{}", name),
            SecurityTarget::Handle(handle) => write!(f, "handle {:#x}", handle),
        }
    }
}

/// Kind of securable object (`SE_OBJECT_TYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    #[default]
    File,
    Service,
    Printer,
    RegistryKey,
    LanmanShare,
    KernelObject,
}

impl ObjectType {
    /// Native `SE_OBJECT_TYPE` value
    pub const fn native(&self) -> i32 {
        match self {
            ObjectType::File => 1,
            ObjectType::Service => 2,
            ObjectType::Printer => 3,
            ObjectType::RegistryKey => 4,
            ObjectType::LanmanShare => 5,
            ObjectType::KernelObject => 6,
        }
    }
}

/// Arguments of one set-security call. Binaries are in their native layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetSecurityRequest<'a> {
    pub information: SecurityInformation,
    pub owner: Option<&'a [u8]>,
    pub group: Option<&'a [u8]>,
    pub dacl: Option<&'a [u8]>,
    pub sacl: Option<&'a [u8]>,
}

/// Operating-system security primitives.
///
/// Thread-scoped operations (`open_thread_token`, `set_thread_token`) act on
/// the calling thread.
pub trait SecurityApi: Send + Sync + fmt::Debug {
    /// Identifies the token state this backend acts on. Backends with equal
    /// keys share the cached process token and each thread's context.
    fn instance_key(&self) -> usize;

    /// Maps a privilege name to its identifier
    fn lookup_privilege_value(&self, name: &str) -> OsResult<PrivilegeId>;

    /// Maps an identifier back to its privilege name
    fn lookup_privilege_name(&self, id: PrivilegeId) -> OsResult<String>;

    /// Opens the calling thread's own token for query and adjust access.
    /// Returns `None` when the thread is not impersonating.
    fn open_thread_token(&self) -> OsResult<Option<TokenHandle>>;

    /// Opens the process token for duplicate and query access
    fn open_process_token(&self) -> OsResult<TokenHandle>;

    /// Duplicates a token into an impersonation-level token usable on a thread
    fn duplicate_for_impersonation(&self, token: TokenHandle) -> OsResult<TokenHandle>;

    /// Attaches `token` to the calling thread, or reverts the thread to the
    /// process identity when `None`
    fn set_thread_token(&self, token: Option<TokenHandle>) -> OsResult<()>;

    /// Enables or disables one privilege, reporting the previous state
    fn adjust_privilege(
        &self,
        token: TokenHandle,
        privilege: PrivilegeId,
        enable: bool,
    ) -> OsResult<AdjustOutcome>;

    /// Enabled state of a privilege on a token, `None` if the token lacks it
    fn privilege_enabled(&self, token: TokenHandle, privilege: PrivilegeId) -> OsResult<Option<bool>>;

    fn close_token(&self, token: TokenHandle) -> OsResult<()>;

    /// Sets security information on an object; returns the native status
    fn set_security_info(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        request: &SetSecurityRequest<'_>,
    ) -> OsCode;
}
