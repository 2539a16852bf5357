//! In-memory model of tokens, impersonation and object security
//!
//! Mirrors the Windows semantics the privilege layer depends on: a process
//! primary token, optional per-thread impersonation tokens, handles that
//! must be closed, "not all assigned" when adjusting a privilege the token
//! does not hold, and `ERROR_PRIVILEGE_NOT_HELD` when a SACL is written
//! without `SeSecurityPrivilege` enabled. Faults and panics can be injected
//! per operation, and every call is counted.

use super::{
    AdjustOutcome, ObjectType, OsCode, OsResult, SecurityApi, SecurityTarget, SetSecurityRequest,
    TokenHandle,
};
use crate::core::types::{PrivilegeId, SecurityInformation};
use crate::privilege::names::{SE_CHANGE_NOTIFY_NAME, SE_SECURITY_NAME, WELL_KNOWN_PRIVILEGES};
use crate::windows::utils::error_codes::{
    ERROR_INVALID_HANDLE, ERROR_NO_SUCH_PRIVILEGE, ERROR_PRIVILEGE_NOT_HELD, ERROR_SUCCESS,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::trace;

lazy_static::lazy_static! {
    static ref DEFAULT_CATALOG: HashMap<String, (String, PrivilegeId)> = WELL_KNOWN_PRIVILEGES
        .iter()
        .map(|(name, low)| (name.to_ascii_lowercase(), (name.to_string(), PrivilegeId::from_low(*low))))
        .collect();
}

/// Operations of the simulated API, for fault injection and accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatedOp {
    LookupPrivilegeValue,
    LookupPrivilegeName,
    OpenThreadToken,
    OpenProcessToken,
    DuplicateToken,
    SetThreadToken,
    AdjustPrivilege,
    QueryPrivilege,
    CloseToken,
    SetSecurityInfo,
}

/// One observed set-security call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSetSecurity {
    pub target: SecurityTarget,
    pub object_type: ObjectType,
    pub information: SecurityInformation,
    pub owner: Option<Vec<u8>>,
    pub group: Option<Vec<u8>>,
    pub dacl: Option<Vec<u8>>,
    pub sacl: Option<Vec<u8>>,
    /// Whether `SeSecurityPrivilege` was enabled on the caller's effective
    /// token when the call was made
    pub security_privilege_enabled: bool,
    pub status: OsCode,
}

#[derive(Debug, Clone, Default)]
struct SimToken {
    // privilege -> enabled; absent means not held
    privileges: HashMap<PrivilegeId, bool>,
}

#[derive(Debug, Default)]
struct SimState {
    tokens: HashMap<u64, SimToken>,
    handles: HashMap<TokenHandle, u64>,
    thread_tokens: HashMap<ThreadId, u64>,
    process_token: u64,
    next_object: u64,
    next_handle: TokenHandle,
    failures: HashMap<SimulatedOp, OsCode>,
    panics: HashSet<SimulatedOp>,
    calls: HashMap<SimulatedOp, usize>,
    set_security_calls: Vec<RecordedSetSecurity>,
}

impl SimState {
    fn new_object(&mut self, token: SimToken) -> u64 {
        self.next_object += 1;
        self.tokens.insert(self.next_object, token);
        self.next_object
    }

    fn new_handle(&mut self, object: u64) -> TokenHandle {
        self.next_handle += 4;
        self.handles.insert(self.next_handle, object);
        self.next_handle
    }

    fn object(&self, handle: TokenHandle) -> OsResult<u64> {
        self.handles.get(&handle).copied().ok_or(ERROR_INVALID_HANDLE)
    }

    fn effective_object(&self, thread: ThreadId) -> u64 {
        self.thread_tokens
            .get(&thread)
            .copied()
            .unwrap_or(self.process_token)
    }
}

/// Simulated [`SecurityApi`] backend
#[derive(Debug)]
pub struct SimulatedSecurityApi {
    catalog: HashMap<String, (String, PrivilegeId)>,
    state: Mutex<SimState>,
}

impl SimulatedSecurityApi {
    /// Creates a backend whose process token holds `SeChangeNotifyPrivilege`
    /// (enabled) and `SeSecurityPrivilege`, `SeBackupPrivilege`,
    /// `SeRestorePrivilege`, `SeTakeOwnershipPrivilege`, `SeDebugPrivilege`,
    /// `SeShutdownPrivilege` (disabled)
    pub fn new() -> Self {
        let catalog = DEFAULT_CATALOG.clone();
        let mut process = SimToken::default();
        for (name, enabled) in [
            (SE_CHANGE_NOTIFY_NAME, true),
            (SE_SECURITY_NAME, false),
            ("SeBackupPrivilege", false),
            ("SeRestorePrivilege", false),
            ("SeTakeOwnershipPrivilege", false),
            ("SeDebugPrivilege", false),
            ("SeShutdownPrivilege", false),
        ] {
            if let Some((_, id)) = catalog.get(&name.to_ascii_lowercase()) {
                process.privileges.insert(*id, enabled);
            }
        }

        let mut state = SimState::default();
        state.process_token = state.new_object(process);

        SimulatedSecurityApi {
            catalog,
            state: Mutex::new(state),
        }
    }

    /// Grants (or re-grants) a privilege to the process token
    pub fn with_process_privilege(self, name: &str, enabled: bool) -> Self {
        if let Some(id) = self.id_of(name) {
            let mut state = self.lock();
            let process = state.process_token;
            if let Some(token) = state.tokens.get_mut(&process) {
                token.privileges.insert(id, enabled);
            }
        }
        self
    }

    /// Removes a privilege from the process token
    pub fn without_process_privilege(self, name: &str) -> Self {
        if let Some(id) = self.id_of(name) {
            let mut state = self.lock();
            let process = state.process_token;
            if let Some(token) = state.tokens.get_mut(&process) {
                token.privileges.remove(&id);
            }
        }
        self
    }

    /// Adds a privilege name unknown to stock Windows
    pub fn with_custom_privilege(mut self, name: &str, id: PrivilegeId) -> Self {
        self.catalog
            .insert(name.to_ascii_lowercase(), (name.to_string(), id));
        self
    }

    /// Makes the next call of `op` fail with `code`
    pub fn fail_next(&self, op: SimulatedOp, code: OsCode) {
        self.lock().failures.insert(op, code);
    }

    /// Makes the next call of `op` panic
    pub fn panic_next(&self, op: SimulatedOp) {
        self.lock().panics.insert(op);
    }

    /// Gives the calling thread an impersonation token of its own, a copy
    /// of the process token, as if it were already impersonating
    pub fn impersonate_current_thread(&self) {
        let mut state = self.lock();
        let copy = state
            .tokens
            .get(&state.process_token)
            .cloned()
            .unwrap_or_default();
        let object = state.new_object(copy);
        state.thread_tokens.insert(thread::current().id(), object);
    }

    /// Number of calls made to `op`, including failed ones
    pub fn call_count(&self, op: SimulatedOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Token handles opened and not yet closed
    pub fn open_handle_count(&self) -> usize {
        self.lock().handles.len()
    }

    /// Whether the calling thread currently has a token attached
    pub fn is_current_thread_impersonating(&self) -> bool {
        self.lock().thread_tokens.contains_key(&thread::current().id())
    }

    /// Enabled state of `name` on the calling thread's effective token
    pub fn effective_privilege(&self, name: &str) -> Option<bool> {
        let id = self.id_of(name)?;
        let state = self.lock();
        let object = state.effective_object(thread::current().id());
        state
            .tokens
            .get(&object)
            .and_then(|token| token.privileges.get(&id).copied())
    }

    /// Enabled state of `name` on the process token
    pub fn process_privilege(&self, name: &str) -> Option<bool> {
        let id = self.id_of(name)?;
        let state = self.lock();
        state
            .tokens
            .get(&state.process_token)
            .and_then(|token| token.privileges.get(&id).copied())
    }

    /// Set-security calls observed so far
    pub fn set_security_calls(&self) -> Vec<RecordedSetSecurity> {
        self.lock().set_security_calls.clone()
    }

    /// Forgets recorded set-security calls and call counts. Token state,
    /// open handles and pending injected faults are kept.
    pub fn clear_recorded(&self) {
        let mut state = self.lock();
        state.set_security_calls.clear();
        state.calls.clear();
    }

    fn id_of(&self, name: &str) -> Option<PrivilegeId> {
        self.catalog
            .get(&name.to_ascii_lowercase())
            .map(|(_, id)| *id)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, op: SimulatedOp) -> OsResult<MutexGuard<'_, SimState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.panics.remove(&op) {
            drop(state);
            panic!("injected panic in simulated {:?}", op);
        }
        if let Some(code) = state.failures.remove(&op) {
            trace!(?op, code, "injected failure");
            return Err(code);
        }
        Ok(state)
    }
}

impl Default for SimulatedSecurityApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityApi for SimulatedSecurityApi {
    fn instance_key(&self) -> usize {
        self as *const Self as usize
    }

    fn lookup_privilege_value(&self, name: &str) -> OsResult<PrivilegeId> {
        let _state = self.enter(SimulatedOp::LookupPrivilegeValue)?;
        self.id_of(name).ok_or(ERROR_NO_SUCH_PRIVILEGE)
    }

    fn lookup_privilege_name(&self, id: PrivilegeId) -> OsResult<String> {
        let _state = self.enter(SimulatedOp::LookupPrivilegeName)?;
        self.catalog
            .values()
            .find(|(_, candidate)| *candidate == id)
            .map(|(name, _)| name.clone())
            .ok_or(ERROR_NO_SUCH_PRIVILEGE)
    }

    fn open_thread_token(&self) -> OsResult<Option<TokenHandle>> {
        let mut state = self.enter(SimulatedOp::OpenThreadToken)?;
        match state.thread_tokens.get(&thread::current().id()).copied() {
            Some(object) => Ok(Some(state.new_handle(object))),
            None => Ok(None),
        }
    }

    fn open_process_token(&self) -> OsResult<TokenHandle> {
        let mut state = self.enter(SimulatedOp::OpenProcessToken)?;
        let process = state.process_token;
        Ok(state.new_handle(process))
    }

    fn duplicate_for_impersonation(&self, token: TokenHandle) -> OsResult<TokenHandle> {
        let mut state = self.enter(SimulatedOp::DuplicateToken)?;
        let source = state.object(token)?;
        let copy = state.tokens.get(&source).cloned().unwrap_or_default();
        let object = state.new_object(copy);
        Ok(state.new_handle(object))
    }

    fn set_thread_token(&self, token: Option<TokenHandle>) -> OsResult<()> {
        let mut state = self.enter(SimulatedOp::SetThreadToken)?;
        let current = thread::current().id();
        match token {
            Some(handle) => {
                let object = state.object(handle)?;
                state.thread_tokens.insert(current, object);
            }
            None => {
                state.thread_tokens.remove(&current);
            }
        }
        Ok(())
    }

    fn adjust_privilege(
        &self,
        token: TokenHandle,
        privilege: PrivilegeId,
        enable: bool,
    ) -> OsResult<AdjustOutcome> {
        let mut state = self.enter(SimulatedOp::AdjustPrivilege)?;
        let object = state.object(token)?;
        let entry = state
            .tokens
            .get_mut(&object)
            .and_then(|t| t.privileges.get_mut(&privilege));
        match entry {
            Some(enabled) => {
                let previous_enabled = *enabled;
                *enabled = enable;
                Ok(AdjustOutcome {
                    previous_enabled,
                    not_all_assigned: false,
                })
            }
            None => Ok(AdjustOutcome {
                previous_enabled: false,
                not_all_assigned: true,
            }),
        }
    }

    fn privilege_enabled(&self, token: TokenHandle, privilege: PrivilegeId) -> OsResult<Option<bool>> {
        let state = self.enter(SimulatedOp::QueryPrivilege)?;
        let object = state.object(token)?;
        Ok(state
            .tokens
            .get(&object)
            .and_then(|t| t.privileges.get(&privilege).copied()))
    }

    fn close_token(&self, token: TokenHandle) -> OsResult<()> {
        let mut state = self.enter(SimulatedOp::CloseToken)?;
        state
            .handles
            .remove(&token)
            .map(|_| ())
            .ok_or(ERROR_INVALID_HANDLE)
    }

    fn set_security_info(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        request: &SetSecurityRequest<'_>,
    ) -> OsCode {
        let security = self.id_of(SE_SECURITY_NAME);
        let mut state = match self.enter(SimulatedOp::SetSecurityInfo) {
            Ok(state) => state,
            Err(code) => return code,
        };

        let effective = state.effective_object(thread::current().id());
        let security_privilege_enabled = security
            .and_then(|id| state.tokens.get(&effective).and_then(|t| t.privileges.get(&id)))
            .copied()
            .unwrap_or(false);

        let status = if request.information.has(SecurityInformation::SACL) && !security_privilege_enabled {
            ERROR_PRIVILEGE_NOT_HELD
        } else {
            ERROR_SUCCESS
        };

        state.set_security_calls.push(RecordedSetSecurity {
            target: target.clone(),
            object_type,
            information: request.information,
            owner: request.owner.map(<[u8]>::to_vec),
            group: request.group.map(<[u8]>::to_vec),
            dacl: request.dacl.map(<[u8]>::to_vec),
            sacl: request.sacl.map(<[u8]>::to_vec),
            security_privilege_enabled,
            status,
        });
        status
    }
}
