//! Advapi32.dll bindings for token, privilege and object security operations
//!
//! Each wrapper returns the raw Win32 code on failure so the caller decides
//! how to classify it.

use crate::core::types::PrivilegeId;
use crate::platform::{AdjustOutcome, OsCode, OsResult, TokenHandle};
use crate::windows::utils::error_codes::{ERROR_NOT_ALL_ASSIGNED, ERROR_NO_TOKEN};
use crate::windows::utils::string_conv::{string_to_wide, wide_to_string};
use std::{mem, ptr};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, LUID, PSID};
use windows::Win32::Security::Authorization::{SetNamedSecurityInfoW, SetSecurityInfo, SE_OBJECT_TYPE};
use windows::Win32::Security::{
    AdjustTokenPrivileges, DuplicateTokenEx, GetTokenInformation, LookupPrivilegeNameW,
    LookupPrivilegeValueW, RevertToSelf, SecurityImpersonation, TokenImpersonation,
    TokenPrivileges, ACL, LUID_AND_ATTRIBUTES, OBJECT_SECURITY_INFORMATION, SE_PRIVILEGE_ENABLED,
    TOKEN_ADJUST_PRIVILEGES, TOKEN_DUPLICATE, TOKEN_IMPERSONATE, TOKEN_PRIVILEGES,
    TOKEN_PRIVILEGES_ATTRIBUTES, TOKEN_QUERY,
};
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetCurrentThread, OpenProcessToken, OpenThreadToken, SetThreadToken,
};

/// Extracts the Win32 code from a `windows` crate error
pub fn win32_code(err: &windows::core::Error) -> OsCode {
    let hr = err.code().0 as u32;
    if hr & 0xFFFF_0000 == 0x8007_0000 {
        hr & 0xFFFF
    } else {
        hr
    }
}

fn to_luid(id: PrivilegeId) -> LUID {
    LUID {
        LowPart: id.low,
        HighPart: id.high,
    }
}

/// Safe wrapper for LookupPrivilegeValueW on the local system
pub fn lookup_privilege_value(name: &str) -> OsResult<PrivilegeId> {
    let wide = string_to_wide(name);
    let mut luid = LUID::default();
    unsafe { LookupPrivilegeValueW(PCWSTR::null(), PCWSTR(wide.as_ptr()), &mut luid) }
        .map_err(|e| win32_code(&e))?;
    Ok(PrivilegeId::new(luid.LowPart, luid.HighPart))
}

/// Safe wrapper for LookupPrivilegeNameW on the local system
pub fn lookup_privilege_name(id: PrivilegeId) -> OsResult<String> {
    let luid = to_luid(id);
    let mut buffer = vec![0u16; 64];
    let mut len = buffer.len() as u32;
    unsafe {
        LookupPrivilegeNameW(
            PCWSTR::null(),
            &luid,
            PWSTR(buffer.as_mut_ptr()),
            &mut len,
        )
    }
    .map_err(|e| win32_code(&e))?;
    Ok(wide_to_string(&buffer))
}

/// Safe wrapper for OpenThreadToken on the calling thread.
/// `ERROR_NO_TOKEN` becomes `Ok(None)`.
pub fn open_thread_token() -> OsResult<Option<TokenHandle>> {
    let mut token = HANDLE::default();
    match unsafe {
        OpenThreadToken(
            GetCurrentThread(),
            TOKEN_QUERY | TOKEN_ADJUST_PRIVILEGES,
            true,
            &mut token,
        )
    } {
        Ok(()) => Ok(Some(token.0)),
        Err(e) if win32_code(&e) == ERROR_NO_TOKEN => Ok(None),
        Err(e) => Err(win32_code(&e)),
    }
}

/// Safe wrapper for OpenProcessToken on the current process
pub fn open_process_token() -> OsResult<TokenHandle> {
    let mut token = HANDLE::default();
    unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_DUPLICATE | TOKEN_QUERY, &mut token) }
        .map_err(|e| win32_code(&e))?;
    Ok(token.0)
}

/// Safe wrapper for DuplicateTokenEx producing an impersonation token
pub fn duplicate_for_impersonation(token: TokenHandle) -> OsResult<TokenHandle> {
    let mut duplicate = HANDLE::default();
    unsafe {
        DuplicateTokenEx(
            HANDLE(token),
            TOKEN_IMPERSONATE | TOKEN_QUERY | TOKEN_ADJUST_PRIVILEGES,
            None,
            SecurityImpersonation,
            TokenImpersonation,
            &mut duplicate,
        )
    }
    .map_err(|e| win32_code(&e))?;
    Ok(duplicate.0)
}

/// Safe wrapper for SetThreadToken / RevertToSelf on the calling thread
pub fn set_thread_token(token: Option<TokenHandle>) -> OsResult<()> {
    match token {
        Some(token) => unsafe { SetThreadToken(None, HANDLE(token)) },
        None => unsafe { RevertToSelf() },
    }
    .map_err(|e| win32_code(&e))
}

/// Safe wrapper for AdjustTokenPrivileges on a single privilege
pub fn adjust_privilege(token: TokenHandle, id: PrivilegeId, enable: bool) -> OsResult<AdjustOutcome> {
    let new_state = TOKEN_PRIVILEGES {
        PrivilegeCount: 1,
        Privileges: [LUID_AND_ATTRIBUTES {
            Luid: to_luid(id),
            Attributes: if enable {
                SE_PRIVILEGE_ENABLED
            } else {
                TOKEN_PRIVILEGES_ATTRIBUTES(0)
            },
        }],
    };
    let mut previous = TOKEN_PRIVILEGES::default();
    let mut previous_len = 0u32;

    unsafe {
        AdjustTokenPrivileges(
            HANDLE(token),
            false,
            Some(&new_state),
            mem::size_of::<TOKEN_PRIVILEGES>() as u32,
            Some(&mut previous),
            Some(&mut previous_len),
        )
    }
    .map_err(|e| win32_code(&e))?;

    // AdjustTokenPrivileges succeeds even when nothing was assigned
    let last = unsafe { GetLastError() }.0;
    if last == ERROR_NOT_ALL_ASSIGNED {
        return Ok(AdjustOutcome {
            previous_enabled: false,
            not_all_assigned: true,
        });
    }

    // An empty previous state means the privilege already had the requested value
    let previous_enabled = if previous.PrivilegeCount == 0 {
        enable
    } else {
        previous.Privileges[0].Attributes & SE_PRIVILEGE_ENABLED == SE_PRIVILEGE_ENABLED
    };

    Ok(AdjustOutcome {
        previous_enabled,
        not_all_assigned: false,
    })
}

/// Enabled state of one privilege on a token, `None` if absent
pub fn privilege_enabled(token: TokenHandle, id: PrivilegeId) -> OsResult<Option<bool>> {
    let mut size = 0u32;
    let _ = unsafe { GetTokenInformation(HANDLE(token), TokenPrivileges, None, 0, &mut size) };
    if size == 0 {
        return Err(unsafe { GetLastError() }.0);
    }

    // word buffer so the TOKEN_PRIVILEGES read below is aligned
    let mut buffer = vec![0u64; (size as usize + 7) / 8];
    unsafe {
        GetTokenInformation(
            HANDLE(token),
            TokenPrivileges,
            Some(buffer.as_mut_ptr().cast()),
            size,
            &mut size,
        )
    }
    .map_err(|e| win32_code(&e))?;

    let privileges = unsafe { &*(buffer.as_ptr() as *const TOKEN_PRIVILEGES) };
    let entries = unsafe {
        std::slice::from_raw_parts(
            privileges.Privileges.as_ptr(),
            privileges.PrivilegeCount as usize,
        )
    };
    let wanted = to_luid(id);
    Ok(entries
        .iter()
        .find(|entry| entry.Luid.LowPart == wanted.LowPart && entry.Luid.HighPart == wanted.HighPart)
        .map(|entry| entry.Attributes & SE_PRIVILEGE_ENABLED == SE_PRIVILEGE_ENABLED))
}

/// Safe wrapper for CloseHandle on a token
pub fn close_token(token: TokenHandle) -> OsResult<()> {
    if token == 0 {
        return Ok(());
    }
    unsafe { CloseHandle(HANDLE(token)) }.map_err(|e| win32_code(&e))
}

fn psid(bytes: Option<&[u8]>) -> PSID {
    bytes.map_or(PSID(ptr::null_mut()), |b| PSID(b.as_ptr() as *mut _))
}

fn pacl(bytes: Option<&[u8]>) -> Option<*const ACL> {
    bytes.map(|b| b.as_ptr().cast::<ACL>())
}

/// Safe wrapper for SetNamedSecurityInfoW
pub fn set_named_security_info(
    name: &str,
    object_type: i32,
    information: u32,
    owner: Option<&[u8]>,
    group: Option<&[u8]>,
    dacl: Option<&[u8]>,
    sacl: Option<&[u8]>,
) -> OsCode {
    let wide = string_to_wide(name);
    unsafe {
        SetNamedSecurityInfoW(
            PCWSTR(wide.as_ptr()),
            SE_OBJECT_TYPE(object_type),
            OBJECT_SECURITY_INFORMATION(information),
            psid(owner),
            psid(group),
            pacl(dacl),
            pacl(sacl),
        )
    }
    .0
}

/// Safe wrapper for SetSecurityInfo on an open handle
pub fn set_security_info(
    handle: isize,
    object_type: i32,
    information: u32,
    owner: Option<&[u8]>,
    group: Option<&[u8]>,
    dacl: Option<&[u8]>,
    sacl: Option<&[u8]>,
) -> OsCode {
    unsafe {
        SetSecurityInfo(
            HANDLE(handle),
            SE_OBJECT_TYPE(object_type),
            OBJECT_SECURITY_INFORMATION(information),
            psid(owner),
            psid(group),
            pacl(dacl),
            pacl(sacl),
        )
    }
    .0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_lookup_security_privilege() {
        let id = lookup_privilege_value("SeSecurityPrivilege").unwrap();
        assert_eq!(lookup_privilege_name(id).unwrap(), "SeSecurityPrivilege");
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_lookup_unknown_privilege() {
        assert!(lookup_privilege_value("SeNonexistentPrivilege").is_err());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_open_and_close_process_token() {
        let token = open_process_token().unwrap();
        assert_ne!(token, 0);
        close_token(token).unwrap();
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_change_notify_enabled_on_process_token() {
        let token = open_process_token().unwrap();
        let id = lookup_privilege_value("SeChangeNotifyPrivilege").unwrap();
        let state = privilege_enabled(token, id);
        close_token(token).unwrap();
        // held and enabled by default for every account
        assert_eq!(state, Ok(Some(true)));
    }

    #[test]
    fn test_close_null_token() {
        assert!(close_token(0).is_ok());
    }
}
