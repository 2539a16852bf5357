//! Per-thread security context shared by every guard on the thread
//!
//! A thread that is not impersonating has no token of its own. The first
//! guard to need one duplicates the process token, attaches the copy to the
//! thread and marks the context as impersonating; the last guard to leave
//! detaches it again. Privileges adjusted in between affect only the copy.
//!
//! Contexts are keyed by [`SecurityApi::instance_key`], so all elevators over
//! the same OS state share one context (and one reference count) per thread.

use crate::core::types::{SecurityError, SecurityResult};
use crate::platform::{SecurityApi, TokenHandle};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, trace, warn};

lazy_static::lazy_static! {
    static ref SHARED_REGISTRIES: Mutex<HashMap<usize, Weak<ThreadContexts>>> =
        Mutex::new(HashMap::new());
}

thread_local! {
    static CONTEXTS: RefCell<HashMap<usize, ThreadSecurityContext>> = RefCell::new(HashMap::new());
}

/// Observable state of the calling thread's context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub token: TokenHandle,
    pub is_impersonating: bool,
    pub reference_count: usize,
}

/// The token a thread's guards adjust, plus bookkeeping.
///
/// Torn down exactly once: either when its reference count reaches zero or,
/// if references were leaked, when the owning thread exits.
struct ThreadSecurityContext {
    api: Arc<dyn SecurityApi>,
    token: Option<TokenHandle>,
    is_impersonating: bool,
    reference_count: usize,
}

impl ThreadSecurityContext {
    fn establish(api: &Arc<dyn SecurityApi>, process_token: &ProcessToken) -> SecurityResult<Self> {
        let open = api
            .open_thread_token()
            .map_err(|code| SecurityError::from_os_code(code, "OpenThreadToken"))?;

        if let Some(token) = open {
            trace!(token, "thread already has a token");
            return Ok(ThreadSecurityContext {
                api: Arc::clone(api),
                token: Some(token),
                is_impersonating: false,
                reference_count: 1,
            });
        }

        let process = process_token.get_or_open(api.as_ref())?;
        let duplicate = api
            .duplicate_for_impersonation(process)
            .map_err(|code| SecurityError::from_os_code(code, "DuplicateTokenEx"))?;

        if let Err(code) = api.set_thread_token(Some(duplicate)) {
            if let Err(close) = api.close_token(duplicate) {
                warn!(token = duplicate, code = close, "failed to close unused token");
            }
            return Err(SecurityError::from_os_code(code, "SetThreadToken"));
        }

        debug!(token = duplicate, "thread now impersonating a copy of the process token");
        Ok(ThreadSecurityContext {
            api: Arc::clone(api),
            token: Some(duplicate),
            is_impersonating: true,
            reference_count: 1,
        })
    }

    fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            token: self.token.unwrap_or_default(),
            is_impersonating: self.is_impersonating,
            reference_count: self.reference_count,
        }
    }

    // Reverts impersonation and closes the token. The token is closed even
    // when the revert fails; the revert error wins.
    fn teardown(&mut self) -> SecurityResult<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        let reverted = if self.is_impersonating {
            self.is_impersonating = false;
            self.api
                .set_thread_token(None)
                .map_err(|code| SecurityError::from_os_code(code, "RevertToSelf"))
        } else {
            Ok(())
        };
        let closed = self
            .api
            .close_token(token)
            .map_err(|code| SecurityError::from_os_code(code, "CloseHandle"));

        debug!(token, "thread security context torn down");
        reverted.and(closed)
    }
}

impl Drop for ThreadSecurityContext {
    fn drop(&mut self) {
        if self.token.is_none() {
            return;
        }
        warn!(
            references = self.reference_count,
            "thread exiting with privilege guards still active"
        );
        if let Err(e) = self.teardown() {
            warn!(error = %e, "failed to tear down thread security context");
        }
    }
}

/// Lazily opened process token, kept for the life of the owning registry
#[derive(Debug, Default)]
struct ProcessToken {
    token: Mutex<Option<TokenHandle>>,
}

impl ProcessToken {
    fn get_or_open(&self, api: &dyn SecurityApi) -> SecurityResult<TokenHandle> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = *cached {
            return Ok(token);
        }
        let token = api
            .open_process_token()
            .map_err(|code| SecurityError::from_os_code(code, "OpenProcessToken"))?;
        *cached = Some(token);
        Ok(token)
    }

    fn take(&mut self) -> Option<TokenHandle> {
        self.token
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Access to the per-thread contexts of one backend.
///
/// Each thread sees its own context, created on first acquire and destroyed
/// on the release that brings its count back to zero. The process token is
/// opened once and cached until the registry is dropped.
pub struct ThreadContexts {
    key: usize,
    api: Arc<dyn SecurityApi>,
    process_token: ProcessToken,
}

impl ThreadContexts {
    /// A registry with its own process-token cache. Thread contexts are
    /// still shared with every other registry over the same backend.
    pub fn new(api: Arc<dyn SecurityApi>) -> Self {
        ThreadContexts {
            key: api.instance_key(),
            api,
            process_token: ProcessToken::default(),
        }
    }

    /// The process-wide registry for `api`'s backend, created on first use
    /// and kept while any elevator holds it
    pub fn shared(api: Arc<dyn SecurityApi>) -> Arc<Self> {
        let key = api.instance_key();
        let mut registries = SHARED_REGISTRIES
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = registries.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        registries.retain(|_, registry| registry.strong_count() > 0);
        let registry = Arc::new(ThreadContexts::new(api));
        registries.insert(key, Arc::downgrade(&registry));
        debug!(key, "security context registry created");
        registry
    }

    pub fn api(&self) -> &Arc<dyn SecurityApi> {
        &self.api
    }

    /// Takes a reference on the calling thread's context, creating it on
    /// first use
    pub fn acquire(&self) -> SecurityResult<ContextSnapshot> {
        let existing = self.with_contexts(|contexts| {
            contexts.get_mut(&self.key).map(|context| {
                context.reference_count += 1;
                context.snapshot()
            })
        })?;
        if let Some(snapshot) = existing {
            trace!(references = snapshot.reference_count, "thread security context reused");
            return Ok(snapshot);
        }

        // OS calls happen outside the registry borrow
        let context = ThreadSecurityContext::establish(&self.api, &self.process_token)?;
        let snapshot = context.snapshot();
        self.with_contexts(|contexts| {
            contexts.insert(self.key, context);
        })?;
        Ok(snapshot)
    }

    /// Drops a reference; returns the remaining count. The context is torn
    /// down when it reaches zero.
    pub fn release(&self) -> SecurityResult<usize> {
        let removed = self.with_contexts(|contexts| {
            match contexts.get(&self.key).map(|c| c.reference_count) {
                Some(count) if count > 1 => {
                    if let Some(context) = contexts.get_mut(&self.key) {
                        context.reference_count = count - 1;
                    }
                    Err(count - 1)
                }
                Some(_) => Ok(contexts.remove(&self.key)),
                None => Ok(None),
            }
        });

        match removed {
            Ok(Ok(Some(mut context))) => {
                context.reference_count = 0;
                context.teardown().map(|_| 0)
            }
            Ok(Ok(None)) => {
                warn!("release without a live thread security context");
                Ok(0)
            }
            Ok(Err(remaining)) => Ok(remaining),
            Err(e) => {
                warn!(error = %e, "release during thread shutdown");
                Ok(0)
            }
        }
    }

    /// The calling thread's context, if any
    pub fn current(&self) -> Option<ContextSnapshot> {
        self.with_contexts(|contexts| contexts.get(&self.key).map(ThreadSecurityContext::snapshot))
            .ok()
            .flatten()
    }

    /// References held on the calling thread's context
    pub fn reference_count(&self) -> usize {
        self.current().map_or(0, |c| c.reference_count)
    }

    fn with_contexts<R>(
        &self,
        f: impl FnOnce(&mut HashMap<usize, ThreadSecurityContext>) -> R,
    ) -> SecurityResult<R> {
        CONTEXTS
            .try_with(|contexts| f(&mut contexts.borrow_mut()))
            .map_err(|_| SecurityError::Unsupported("thread is shutting down".to_string()))
    }
}

impl Drop for ThreadContexts {
    fn drop(&mut self) {
        if let Some(token) = self.process_token.take() {
            if let Err(code) = self.api.close_token(token) {
                warn!(token, code, "failed to close cached process token");
            }
        }
    }
}

impl fmt::Debug for ThreadContexts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadContexts")
            .field("key", &format_args!("{:#x}", self.key))
            .finish()
    }
}

/// Releases one context reference when dropped, unless finished explicitly
pub(crate) struct ContextRelease<'a> {
    contexts: &'a ThreadContexts,
    armed: bool,
}

impl<'a> ContextRelease<'a> {
    pub(crate) fn new(contexts: &'a ThreadContexts) -> Self {
        ContextRelease {
            contexts,
            armed: true,
        }
    }

    pub(crate) fn finish(mut self) -> SecurityResult<usize> {
        self.armed = false;
        self.contexts.release()
    }
}

impl Drop for ContextRelease<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.contexts.release() {
                warn!(error = %e, "failed to release thread security context");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SimulatedOp, SimulatedSecurityApi};
    use crate::windows::utils::error_codes::{ERROR_ACCESS_DENIED, ERROR_INVALID_HANDLE};

    fn registry() -> (Arc<SimulatedSecurityApi>, ThreadContexts) {
        let api = Arc::new(SimulatedSecurityApi::new());
        let contexts = ThreadContexts::new(api.clone());
        (api, contexts)
    }

    #[test]
    fn test_first_acquire_impersonates() {
        let (api, contexts) = registry();
        let snapshot = contexts.acquire().unwrap();
        assert!(snapshot.is_impersonating);
        assert_eq!(snapshot.reference_count, 1);
        assert!(api.is_current_thread_impersonating());

        assert_eq!(contexts.release().unwrap(), 0);
        assert!(!api.is_current_thread_impersonating());
        assert!(contexts.current().is_none());
    }

    #[test]
    fn test_nested_acquire_shares_context() {
        let (api, contexts) = registry();
        let outer = contexts.acquire().unwrap();
        let inner = contexts.acquire().unwrap();
        assert_eq!(outer.token, inner.token);
        assert_eq!(inner.reference_count, 2);
        assert_eq!(api.call_count(SimulatedOp::DuplicateToken), 1);

        assert_eq!(contexts.release().unwrap(), 1);
        assert!(api.is_current_thread_impersonating());
        assert_eq!(contexts.release().unwrap(), 0);
        assert!(!api.is_current_thread_impersonating());
    }

    #[test]
    fn test_existing_thread_token_is_not_impersonation() {
        let (api, contexts) = registry();
        api.impersonate_current_thread();
        let snapshot = contexts.acquire().unwrap();
        assert!(!snapshot.is_impersonating);
        assert_eq!(api.call_count(SimulatedOp::DuplicateToken), 0);

        contexts.release().unwrap();
        // a pre-existing impersonation is left alone
        assert!(api.is_current_thread_impersonating());
        assert_eq!(api.call_count(SimulatedOp::SetThreadToken), 0);
        assert_eq!(api.open_handle_count(), 0);
    }

    #[test]
    fn test_set_thread_token_failure_closes_duplicate() {
        let (api, contexts) = registry();
        api.fail_next(SimulatedOp::SetThreadToken, ERROR_ACCESS_DENIED);
        assert!(matches!(contexts.acquire(), Err(SecurityError::AccessDenied(_))));
        assert!(contexts.current().is_none());
        // only the cached process token remains open
        assert_eq!(api.open_handle_count(), 1);
    }

    #[test]
    fn test_release_without_context() {
        let (_, contexts) = registry();
        assert_eq!(contexts.release().unwrap(), 0);
    }

    #[test]
    fn test_token_closed_even_if_revert_fails() {
        let (api, contexts) = registry();
        contexts.acquire().unwrap();
        api.fail_next(SimulatedOp::SetThreadToken, ERROR_INVALID_HANDLE);
        assert!(contexts.release().is_err());
        assert!(contexts.current().is_none());
        assert_eq!(api.open_handle_count(), 1);
    }

    #[test]
    fn test_process_token_closed_with_registry() {
        let (api, contexts) = registry();
        contexts.acquire().unwrap();
        contexts.release().unwrap();
        assert_eq!(api.open_handle_count(), 1);
        drop(contexts);
        assert_eq!(api.open_handle_count(), 0);
    }

    #[test]
    fn test_registries_over_one_backend_share_the_thread_context() {
        let api = Arc::new(SimulatedSecurityApi::new());
        let first = ThreadContexts::new(api.clone());
        let second = ThreadContexts::new(api.clone());
        let outer = first.acquire().unwrap();
        let inner = second.acquire().unwrap();
        assert_eq!(outer.token, inner.token);
        assert!(inner.is_impersonating);
        assert_eq!(first.reference_count(), 2);

        // released out of order, torn down once
        assert_eq!(first.release().unwrap(), 1);
        assert!(api.is_current_thread_impersonating());
        assert_eq!(second.release().unwrap(), 0);
        assert!(!api.is_current_thread_impersonating());
        assert_eq!(api.call_count(SimulatedOp::DuplicateToken), 1);
    }

    #[test]
    fn test_separate_backends_keep_separate_contexts() {
        let (first_api, first) = registry();
        let (_, second) = registry();
        first.acquire().unwrap();
        assert!(second.current().is_none());
        first.release().unwrap();
        assert!(!first_api.is_current_thread_impersonating());
    }

    #[test]
    fn test_shared_registry_per_backend() {
        let api = Arc::new(SimulatedSecurityApi::new());
        let first = ThreadContexts::shared(api.clone());
        let second = ThreadContexts::shared(api.clone());
        assert!(Arc::ptr_eq(&first, &second));

        first.acquire().unwrap();
        second.release().unwrap();
        // one cached process token for both
        assert_eq!(api.call_count(SimulatedOp::OpenProcessToken), 1);

        drop(first);
        drop(second);
        assert_eq!(api.open_handle_count(), 0);
        let fresh = ThreadContexts::shared(api.clone());
        assert_eq!(fresh.reference_count(), 0);
    }

    #[test]
    fn test_context_release_on_drop() {
        let (_, contexts) = registry();
        contexts.acquire().unwrap();
        {
            let _release = ContextRelease::new(&contexts);
        }
        assert_eq!(contexts.reference_count(), 0);
    }
}
