//! Thread-scoped privilege elevation
//!
//! [`PrivilegeElevator`] resolves privilege names and hands out
//! [`PrivilegeGuard`]s. Guards on one thread share a single security context
//! for that thread: the first one makes the thread impersonate a copy of the
//! process token, the last one to revert undoes it.

mod context;
mod elevator;
mod guard;
pub mod names;
mod resolver;

pub use context::{ContextSnapshot, ThreadContexts};
pub use elevator::{ElevationOptions, PrivilegeElevator, PrivilegeState};
#[cfg(windows)]
pub use elevator::{default_elevator, elevate_privilege};
pub use guard::{GuardState, PrivilegeGuard, ScopedPrivilege};
pub use resolver::PrivilegeNameResolver;
