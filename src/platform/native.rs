//! [`SecurityApi`] over the real Windows security API

use super::{
    AdjustOutcome, ObjectType, OsCode, OsResult, SecurityApi, SecurityTarget, SetSecurityRequest,
    TokenHandle,
};
use crate::core::types::PrivilegeId;
use crate::windows::bindings::advapi32;

/// Native Windows backend; stateless, all state lives in the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSecurityApi;

impl NativeSecurityApi {
    pub fn new() -> Self {
        NativeSecurityApi
    }
}

impl SecurityApi for NativeSecurityApi {
    // every instance acts on the same OS state
    fn instance_key(&self) -> usize {
        0
    }

    fn lookup_privilege_value(&self, name: &str) -> OsResult<PrivilegeId> {
        advapi32::lookup_privilege_value(name)
    }

    fn lookup_privilege_name(&self, id: PrivilegeId) -> OsResult<String> {
        advapi32::lookup_privilege_name(id)
    }

    fn open_thread_token(&self) -> OsResult<Option<TokenHandle>> {
        advapi32::open_thread_token()
    }

    fn open_process_token(&self) -> OsResult<TokenHandle> {
        advapi32::open_process_token()
    }

    fn duplicate_for_impersonation(&self, token: TokenHandle) -> OsResult<TokenHandle> {
        advapi32::duplicate_for_impersonation(token)
    }

    fn set_thread_token(&self, token: Option<TokenHandle>) -> OsResult<()> {
        advapi32::set_thread_token(token)
    }

    fn adjust_privilege(
        &self,
        token: TokenHandle,
        privilege: PrivilegeId,
        enable: bool,
    ) -> OsResult<AdjustOutcome> {
        advapi32::adjust_privilege(token, privilege, enable)
    }

    fn privilege_enabled(&self, token: TokenHandle, privilege: PrivilegeId) -> OsResult<Option<bool>> {
        advapi32::privilege_enabled(token, privilege)
    }

    fn close_token(&self, token: TokenHandle) -> OsResult<()> {
        advapi32::close_token(token)
    }

    fn set_security_info(
        &self,
        target: &SecurityTarget,
        object_type: ObjectType,
        request: &SetSecurityRequest<'_>,
    ) -> OsCode {
        match target {
            SecurityTarget::Name(name) => advapi32::set_named_security_info(
                name,
                object_type.native(),
                request.information.bits(),
                request.owner,
                request.group,
                request.dacl,
                request.sacl,
            ),
            SecurityTarget::Handle(handle) => advapi32::set_security_info(
                *handle,
                object_type.native(),
                request.information.bits(),
                request.owner,
                request.group,
                request.dacl,
                request.sacl,
            ),
        }
    }
}
