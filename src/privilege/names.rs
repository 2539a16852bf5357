//! Well-known privilege names and their customary LUID low parts

pub const SE_CREATE_TOKEN_NAME: &str = "SeCreateTokenPrivilege";
pub const SE_ASSIGNPRIMARYTOKEN_NAME: &str = "SeAssignPrimaryTokenPrivilege";
pub const SE_LOCK_MEMORY_NAME: &str = "SeLockMemoryPrivilege";
pub const SE_INCREASE_QUOTA_NAME: &str = "SeIncreaseQuotaPrivilege";
pub const SE_MACHINE_ACCOUNT_NAME: &str = "SeMachineAccountPrivilege";
pub const SE_TCB_NAME: &str = "SeTcbPrivilege";
pub const SE_SECURITY_NAME: &str = "SeSecurityPrivilege";
pub const SE_TAKE_OWNERSHIP_NAME: &str = "SeTakeOwnershipPrivilege";
pub const SE_LOAD_DRIVER_NAME: &str = "SeLoadDriverPrivilege";
pub const SE_SYSTEM_PROFILE_NAME: &str = "SeSystemProfilePrivilege";
pub const SE_SYSTEMTIME_NAME: &str = "SeSystemtimePrivilege";
pub const SE_PROF_SINGLE_PROCESS_NAME: &str = "SeProfileSingleProcessPrivilege";
pub const SE_INC_BASE_PRIORITY_NAME: &str = "SeIncreaseBasePriorityPrivilege";
pub const SE_CREATE_PAGEFILE_NAME: &str = "SeCreatePagefilePrivilege";
pub const SE_CREATE_PERMANENT_NAME: &str = "SeCreatePermanentPrivilege";
pub const SE_BACKUP_NAME: &str = "SeBackupPrivilege";
pub const SE_RESTORE_NAME: &str = "SeRestorePrivilege";
pub const SE_SHUTDOWN_NAME: &str = "SeShutdownPrivilege";
pub const SE_DEBUG_NAME: &str = "SeDebugPrivilege";
pub const SE_AUDIT_NAME: &str = "SeAuditPrivilege";
pub const SE_SYSTEM_ENVIRONMENT_NAME: &str = "SeSystemEnvironmentPrivilege";
pub const SE_CHANGE_NOTIFY_NAME: &str = "SeChangeNotifyPrivilege";
pub const SE_REMOTE_SHUTDOWN_NAME: &str = "SeRemoteShutdownPrivilege";
pub const SE_UNDOCK_NAME: &str = "SeUndockPrivilege";
pub const SE_SYNC_AGENT_NAME: &str = "SeSyncAgentPrivilege";
pub const SE_ENABLE_DELEGATION_NAME: &str = "SeEnableDelegationPrivilege";
pub const SE_MANAGE_VOLUME_NAME: &str = "SeManageVolumePrivilege";
pub const SE_IMPERSONATE_NAME: &str = "SeImpersonatePrivilege";
pub const SE_CREATE_GLOBAL_NAME: &str = "SeCreateGlobalPrivilege";
pub const SE_TRUSTED_CREDMAN_ACCESS_NAME: &str = "SeTrustedCredManAccessPrivilege";
pub const SE_RELABEL_NAME: &str = "SeRelabelPrivilege";
pub const SE_INC_WORKING_SET_NAME: &str = "SeIncreaseWorkingSetPrivilege";
pub const SE_TIME_ZONE_NAME: &str = "SeTimeZonePrivilege";
pub const SE_CREATE_SYMBOLIC_LINK_NAME: &str = "SeCreateSymbolicLinkPrivilege";
pub const SE_DELEGATE_SESSION_USER_IMPERSONATE_NAME: &str =
    "SeDelegateSessionUserImpersonatePrivilege";

/// Privilege required to read or write a system ACL
pub const AUDIT_SECTION_PRIVILEGE: &str = SE_SECURITY_NAME;

/// Name and LUID low part of every privilege a stock Windows installation
/// defines, in LUID order
pub const WELL_KNOWN_PRIVILEGES: [(&str, u32); 35] = [
    (SE_CREATE_TOKEN_NAME, 2),
    (SE_ASSIGNPRIMARYTOKEN_NAME, 3),
    (SE_LOCK_MEMORY_NAME, 4),
    (SE_INCREASE_QUOTA_NAME, 5),
    (SE_MACHINE_ACCOUNT_NAME, 6),
    (SE_TCB_NAME, 7),
    (SE_SECURITY_NAME, 8),
    (SE_TAKE_OWNERSHIP_NAME, 9),
    (SE_LOAD_DRIVER_NAME, 10),
    (SE_SYSTEM_PROFILE_NAME, 11),
    (SE_SYSTEMTIME_NAME, 12),
    (SE_PROF_SINGLE_PROCESS_NAME, 13),
    (SE_INC_BASE_PRIORITY_NAME, 14),
    (SE_CREATE_PAGEFILE_NAME, 15),
    (SE_CREATE_PERMANENT_NAME, 16),
    (SE_BACKUP_NAME, 17),
    (SE_RESTORE_NAME, 18),
    (SE_SHUTDOWN_NAME, 19),
    (SE_DEBUG_NAME, 20),
    (SE_AUDIT_NAME, 21),
    (SE_SYSTEM_ENVIRONMENT_NAME, 22),
    (SE_CHANGE_NOTIFY_NAME, 23),
    (SE_REMOTE_SHUTDOWN_NAME, 24),
    (SE_UNDOCK_NAME, 25),
    (SE_SYNC_AGENT_NAME, 26),
    (SE_ENABLE_DELEGATION_NAME, 27),
    (SE_MANAGE_VOLUME_NAME, 28),
    (SE_IMPERSONATE_NAME, 29),
    (SE_CREATE_GLOBAL_NAME, 30),
    (SE_TRUSTED_CREDMAN_ACCESS_NAME, 31),
    (SE_RELABEL_NAME, 32),
    (SE_INC_WORKING_SET_NAME, 33),
    (SE_TIME_ZONE_NAME, 34),
    (SE_CREATE_SYMBOLIC_LINK_NAME, 35),
    (SE_DELEGATE_SESSION_USER_IMPERSONATE_NAME, 36),
];

/// Checks the `Se…Privilege` naming convention
pub fn is_well_formed(name: &str) -> bool {
    name.len() > "SePrivilege".len() && name.starts_with("Se") && name.ends_with("Privilege")
}
