//! Scoped enabling of a single privilege on the calling thread

use super::context::{ContextRelease, ThreadContexts};
use crate::core::types::{PrivilegeId, SecurityError, SecurityResult};
use crate::windows::utils::error_codes::{ERROR_NOT_ALL_ASSIGNED, ERROR_PRIVILEGE_NOT_HELD};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};

/// Lifecycle of a [`PrivilegeGuard`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Enabling,
    Enabled,
}

/// Enables one privilege for the duration of a scope and restores it after.
///
/// A guard belongs to the thread that created it; using it from any other
/// thread fails with [`SecurityError::WrongThread`] without touching the OS.
/// Dropping an enabled guard reverts it.
///
/// Dropping an enabled guard on a thread other than its owner cannot revert
/// it. The owner's impersonation token and reference stay in place until
/// that thread exits, so move a guard back to its owner before dropping it.
pub struct PrivilegeGuard {
    contexts: Arc<ThreadContexts>,
    privilege_id: PrivilegeId,
    privilege_name: String,
    owning_thread: ThreadId,
    initial_enabled_state: bool,
    state_changed: bool,
    needs_revert: bool,
    holds_context: bool,
    state: GuardState,
}

impl PrivilegeGuard {
    pub(crate) fn new(contexts: Arc<ThreadContexts>, privilege_id: PrivilegeId, privilege_name: &str) -> Self {
        PrivilegeGuard {
            contexts,
            privilege_id,
            privilege_name: privilege_name.to_string(),
            owning_thread: thread::current().id(),
            initial_enabled_state: false,
            state_changed: false,
            needs_revert: false,
            holds_context: false,
            state: GuardState::Idle,
        }
    }

    pub fn privilege_name(&self) -> &str {
        &self.privilege_name
    }

    pub fn privilege_id(&self) -> PrivilegeId {
        self.privilege_id
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == GuardState::Enabled
    }

    /// Whether `enable` actually flipped the privilege from disabled
    pub fn state_changed(&self) -> bool {
        self.state_changed
    }

    /// Enabled state observed before `enable`
    pub fn initial_enabled_state(&self) -> bool {
        self.initial_enabled_state
    }

    pub fn needs_revert(&self) -> bool {
        self.needs_revert
    }

    /// Enables the privilege on the calling thread's token.
    ///
    /// Fails with [`SecurityError::PrivilegeNotHeld`] when the token does not
    /// hold it at all; the guard is then idle again and may be retried.
    pub fn enable(&mut self) -> SecurityResult<()> {
        self.check_thread("enable")?;
        if self.state != GuardState::Idle {
            return Err(SecurityError::AlreadyActive(self.privilege_name.clone()));
        }

        self.state = GuardState::Enabling;
        let context = match self.contexts.acquire() {
            Ok(context) => context,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };
        self.holds_context = true;

        let adjusted = match self
            .contexts
            .api()
            .adjust_privilege(context.token, self.privilege_id, true)
        {
            Ok(outcome) if outcome.not_all_assigned => {
                Err(SecurityError::PrivilegeNotHeld(self.privilege_name.clone()))
            }
            Ok(outcome) => Ok(outcome),
            Err(code) => Err(self.adjust_error(code)),
        };

        match adjusted {
            Ok(outcome) => {
                self.initial_enabled_state = outcome.previous_enabled;
                self.state_changed = !outcome.previous_enabled;
                self.needs_revert = context.is_impersonating || self.state_changed;
                self.state = GuardState::Enabled;
                debug!(
                    privilege = %self.privilege_name,
                    changed = self.state_changed,
                    references = context.reference_count,
                    "privilege enabled"
                );
                Ok(())
            }
            Err(e) => {
                self.reset();
                if let Err(release) = self.contexts.release() {
                    warn!(error = %release, "failed to release context after enable failure");
                }
                Err(e)
            }
        }
    }

    /// Restores the privilege and releases the thread context.
    ///
    /// Idempotent: reverting an idle guard does nothing. The context is
    /// released on every path, even if restoring fails or panics; a restore
    /// failure is reported ahead of a release failure.
    pub fn revert(&mut self) -> SecurityResult<()> {
        self.check_thread("revert")?;
        if !self.holds_context {
            return Ok(());
        }

        let restore_to = self.initial_enabled_state;
        let should_restore = self.needs_revert && self.state_changed;
        self.reset();

        let contexts = Arc::clone(&self.contexts);
        let release = ContextRelease::new(&contexts);

        // The last reference of an impersonating context discards the token
        // copy, which restores everything at once
        let restored = match contexts.current() {
            Some(context)
                if should_restore && (context.reference_count > 1 || !context.is_impersonating) =>
            {
                contexts
                    .api()
                    .adjust_privilege(context.token, self.privilege_id, restore_to)
                    .map(|_| ())
                    .map_err(|code| self.adjust_error(code))
            }
            _ => Ok(()),
        };

        let released = release.finish();
        debug!(privilege = %self.privilege_name, "privilege reverted");
        restored.and(released.map(|_| ()))
    }

    fn reset(&mut self) {
        self.state = GuardState::Idle;
        self.holds_context = false;
        self.needs_revert = false;
        self.state_changed = false;
        self.initial_enabled_state = false;
    }

    fn check_thread(&self, operation: &str) -> SecurityResult<()> {
        let current = thread::current().id();
        if current == self.owning_thread {
            return Ok(());
        }
        error!(
            privilege = %self.privilege_name,
            owner = ?self.owning_thread,
            caller = ?current,
            "{} called from a foreign thread",
            operation
        );
        Err(SecurityError::WrongThread(format!(
            "{} guard owned by {:?}, used on {:?}",
            self.privilege_name, self.owning_thread, current
        )))
    }

    fn adjust_error(&self, code: u32) -> SecurityError {
        match code {
            ERROR_NOT_ALL_ASSIGNED | ERROR_PRIVILEGE_NOT_HELD => {
                SecurityError::PrivilegeNotHeld(self.privilege_name.clone())
            }
            _ => SecurityError::from_os_code(code, format!("AdjustTokenPrivileges({})", self.privilege_name)),
        }
    }
}

impl Drop for PrivilegeGuard {
    fn drop(&mut self) {
        if !self.holds_context {
            return;
        }
        if thread::current().id() != self.owning_thread {
            error!(
                privilege = %self.privilege_name,
                "guard dropped on a foreign thread; its context lives until the owning thread exits"
            );
            return;
        }
        if let Err(e) = self.revert() {
            warn!(privilege = %self.privilege_name, error = %e, "failed to revert privilege on drop");
        }
    }
}

impl fmt::Debug for PrivilegeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeGuard")
            .field("privilege", &self.privilege_name)
            .field("id", &self.privilege_id)
            .field("state", &self.state)
            .field("state_changed", &self.state_changed)
            .field("owning_thread", &self.owning_thread)
            .finish()
    }
}

/// A privilege held enabled until this value is dropped.
///
/// Not `Send`: it is always dropped on the thread that enabled it.
#[derive(Debug)]
pub struct ScopedPrivilege {
    guard: PrivilegeGuard,
    _not_send: PhantomData<*const ()>,
}

impl ScopedPrivilege {
    pub(crate) fn enable(mut guard: PrivilegeGuard) -> SecurityResult<Self> {
        guard.enable()?;
        Ok(ScopedPrivilege {
            guard,
            _not_send: PhantomData,
        })
    }

    pub fn privilege_name(&self) -> &str {
        self.guard.privilege_name()
    }

    pub fn guard(&self) -> &PrivilegeGuard {
        &self.guard
    }

    /// Reverts now, surfacing any error that dropping would only log
    pub fn revert(mut self) -> SecurityResult<()> {
        self.guard.revert()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SecurityApi, SimulatedOp, SimulatedSecurityApi};
    use crate::privilege::names::{SE_BACKUP_NAME, SE_CHANGE_NOTIFY_NAME, SE_SECURITY_NAME};
    use crate::windows::utils::error_codes::ERROR_ACCESS_DENIED;

    fn setup(api: SimulatedSecurityApi) -> (Arc<SimulatedSecurityApi>, Arc<ThreadContexts>) {
        let api = Arc::new(api);
        let contexts = Arc::new(ThreadContexts::new(api.clone()));
        (api, contexts)
    }

    fn guard(api: &SimulatedSecurityApi, contexts: &Arc<ThreadContexts>, name: &str) -> PrivilegeGuard {
        let id = api.lookup_privilege_value(name).unwrap();
        PrivilegeGuard::new(Arc::clone(contexts), id, name)
    }

    #[test]
    fn test_enable_and_revert() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);

        g.enable().unwrap();
        assert_eq!(g.state(), GuardState::Enabled);
        assert!(g.state_changed());
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(true));
        assert_eq!(api.process_privilege(SE_SECURITY_NAME), Some(false));

        g.revert().unwrap();
        assert_eq!(g.state(), GuardState::Idle);
        assert!(!api.is_current_thread_impersonating());
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(false));
    }

    #[test]
    fn test_already_enabled_privilege() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_CHANGE_NOTIFY_NAME);
        g.enable().unwrap();
        assert!(!g.state_changed());
        assert!(g.initial_enabled_state());
        g.revert().unwrap();
        assert_eq!(api.effective_privilege(SE_CHANGE_NOTIFY_NAME), Some(true));
    }

    #[test]
    fn test_enable_twice_is_already_active() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_BACKUP_NAME);
        g.enable().unwrap();
        assert!(matches!(g.enable(), Err(SecurityError::AlreadyActive(_))));
        assert_eq!(contexts.reference_count(), 1);
    }

    #[test]
    fn test_privilege_not_held() {
        let (api, contexts) = setup(SimulatedSecurityApi::new().without_process_privilege(SE_SECURITY_NAME));
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        assert_eq!(
            g.enable(),
            Err(SecurityError::PrivilegeNotHeld(SE_SECURITY_NAME.to_string()))
        );
        assert_eq!(g.state(), GuardState::Idle);
        assert!(contexts.current().is_none());
        assert!(!api.is_current_thread_impersonating());
    }

    #[test]
    fn test_adjust_failure_releases_context() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        api.fail_next(SimulatedOp::AdjustPrivilege, ERROR_ACCESS_DENIED);
        assert!(matches!(g.enable(), Err(SecurityError::AccessDenied(_))));
        assert!(contexts.current().is_none());

        // retry works
        g.enable().unwrap();
        g.revert().unwrap();
    }

    #[test]
    fn test_revert_idle_guard_is_noop() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.revert().unwrap();
        g.revert().unwrap();
        assert_eq!(api.call_count(SimulatedOp::AdjustPrivilege), 0);
        assert_eq!(api.call_count(SimulatedOp::OpenThreadToken), 0);
    }

    #[test]
    fn test_drop_reverts() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        {
            let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
            g.enable().unwrap();
        }
        assert!(contexts.current().is_none());
        assert!(!api.is_current_thread_impersonating());
    }

    #[test]
    fn test_nested_guards_restore_in_order() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut outer = guard(&api, &contexts, SE_SECURITY_NAME);
        let mut inner = guard(&api, &contexts, SE_BACKUP_NAME);

        outer.enable().unwrap();
        inner.enable().unwrap();
        assert_eq!(contexts.reference_count(), 2);
        assert_eq!(api.effective_privilege(SE_BACKUP_NAME), Some(true));

        inner.revert().unwrap();
        // inner restored explicitly; outer still in effect
        assert_eq!(api.effective_privilege(SE_BACKUP_NAME), Some(false));
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(true));

        outer.revert().unwrap();
        assert!(!api.is_current_thread_impersonating());
        // one duplicate for both guards
        assert_eq!(api.call_count(SimulatedOp::DuplicateToken), 1);
    }

    #[test]
    fn test_last_impersonating_reference_skips_restore() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.enable().unwrap();
        g.revert().unwrap();
        // enable only; the discarded copy makes the restore unnecessary
        assert_eq!(api.call_count(SimulatedOp::AdjustPrivilege), 1);
    }

    #[test]
    fn test_pre_impersonating_thread_restores_explicitly() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        api.impersonate_current_thread();
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.enable().unwrap();
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(true));
        g.revert().unwrap();
        assert_eq!(api.call_count(SimulatedOp::AdjustPrivilege), 2);
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(false));
        assert!(api.is_current_thread_impersonating());
    }

    #[test]
    fn test_restore_failure_still_releases() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        api.impersonate_current_thread();
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.enable().unwrap();
        api.fail_next(SimulatedOp::AdjustPrivilege, ERROR_ACCESS_DENIED);
        assert!(matches!(g.revert(), Err(SecurityError::AccessDenied(_))));
        assert!(contexts.current().is_none());
        assert_eq!(g.state(), GuardState::Idle);
    }

    #[test]
    fn test_wrong_thread() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.enable().unwrap();

        let (mut g, result) = std::thread::spawn(move || {
            let mut g = g;
            let result = g.revert();
            (g, result)
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(SecurityError::WrongThread(_))));
        assert_eq!(g.state(), GuardState::Enabled);
        g.revert().unwrap();
        assert!(contexts.current().is_none());
    }

    #[test]
    fn test_foreign_drop_leaves_owner_context_held() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        let mut g = guard(&api, &contexts, SE_SECURITY_NAME);
        g.enable().unwrap();

        std::thread::spawn(move || drop(g)).join().unwrap();

        assert_eq!(contexts.current().unwrap().reference_count, 1);
        assert!(api.is_current_thread_impersonating());
        assert_eq!(api.effective_privilege(SE_SECURITY_NAME), Some(true));
    }

    #[test]
    fn test_scoped_privilege() {
        let (api, contexts) = setup(SimulatedSecurityApi::new());
        {
            let scoped = ScopedPrivilege::enable(guard(&api, &contexts, SE_BACKUP_NAME)).unwrap();
            assert_eq!(scoped.privilege_name(), SE_BACKUP_NAME);
            assert!(scoped.guard().is_enabled());
            assert_eq!(api.effective_privilege(SE_BACKUP_NAME), Some(true));
        }
        assert!(contexts.current().is_none());
    }
}
