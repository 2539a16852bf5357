//! Privilege elevation entry point

use super::context::{ContextSnapshot, ThreadContexts};
use super::guard::{PrivilegeGuard, ScopedPrivilege};
use super::names::AUDIT_SECTION_PRIVILEGE;
use super::resolver::PrivilegeNameResolver;
use crate::config::{Config, ConfigResult, ConfigValidator};
use crate::core::types::{PrivilegeId, SecurityError, SecurityResult};
use crate::platform::{ObjectType, SecurityApi};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// State of a privilege on the calling thread's effective token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeState {
    /// Privilege is enabled
    Enabled,
    /// Privilege is held but disabled
    Disabled,
    /// Privilege is not available to the token
    NotPresent,
}

/// Options for privilege elevation and descriptor transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationOptions {
    /// Privilege enabled around SACL writes
    pub audit_privilege: String,
    /// Object type used when the caller does not name one
    pub object_type: ObjectType,
}

impl Default for ElevationOptions {
    fn default() -> Self {
        ElevationOptions {
            audit_privilege: AUDIT_SECTION_PRIVILEGE.to_string(),
            object_type: ObjectType::default(),
        }
    }
}

struct ElevatorInner {
    resolver: PrivilegeNameResolver,
    contexts: Arc<ThreadContexts>,
    options: ElevationOptions,
}

/// Enables privileges on the calling thread over one [`SecurityApi`]
/// backend.
///
/// Cheap to clone; clones share the name cache. Every elevator over the
/// same backend shares the cached process token and each thread's context,
/// so guards from different elevators nest on one token.
#[derive(Clone)]
pub struct PrivilegeElevator {
    inner: Arc<ElevatorInner>,
}

impl PrivilegeElevator {
    /// Create an elevator with default options
    pub fn new(api: Arc<dyn SecurityApi>) -> Self {
        Self::with_options(api, ElevationOptions::default())
    }

    /// Create with custom options
    pub fn with_options(api: Arc<dyn SecurityApi>, options: ElevationOptions) -> Self {
        PrivilegeElevator {
            inner: Arc::new(ElevatorInner {
                resolver: PrivilegeNameResolver::new(Arc::clone(&api)),
                contexts: ThreadContexts::shared(api),
                options,
            }),
        }
    }

    /// Create from a validated configuration, warming the name cache with
    /// its preload list. Names that fail to resolve are logged and skipped.
    pub fn with_config(api: Arc<dyn SecurityApi>, config: &Config) -> ConfigResult<Self> {
        ConfigValidator::validate(config)?;
        let elevator = Self::with_options(
            api,
            ElevationOptions {
                audit_privilege: config.privileges.audit_privilege.clone(),
                object_type: config.transfer.object_type,
            },
        );
        for name in &config.privileges.preload {
            if let Err(e) = elevator.resolve(name) {
                warn!(privilege = %name, error = %e, "failed to preload privilege");
            }
        }
        Ok(elevator)
    }

    /// Elevator over the native Windows API
    #[cfg(windows)]
    pub fn native() -> Self {
        Self::new(Arc::new(crate::platform::NativeSecurityApi::new()))
    }

    pub fn api(&self) -> &Arc<dyn SecurityApi> {
        self.inner.contexts.api()
    }

    pub fn options(&self) -> &ElevationOptions {
        &self.inner.options
    }

    pub fn resolver(&self) -> &PrivilegeNameResolver {
        &self.inner.resolver
    }

    pub fn resolve(&self, name: &str) -> SecurityResult<PrivilegeId> {
        self.inner.resolver.resolve(name)
    }

    /// Creates an idle guard for `name`, bound to the calling thread
    pub fn guard(&self, name: &str) -> SecurityResult<PrivilegeGuard> {
        let id = self.resolve(name)?;
        Ok(PrivilegeGuard::new(Arc::clone(&self.inner.contexts), id, name))
    }

    /// Enables `name` until the returned value is dropped
    pub fn elevate(&self, name: &str) -> SecurityResult<ScopedPrivilege> {
        ScopedPrivilege::enable(self.guard(name)?)
    }

    /// Runs `f` with `name` enabled, reverting afterward.
    ///
    /// An error from `f` takes precedence over a revert failure, which is
    /// then only logged.
    pub fn with_privilege<F, R, E>(&self, name: &str, f: F) -> Result<R, E>
    where
        F: FnOnce() -> Result<R, E>,
        E: From<SecurityError>,
    {
        let scoped = self.elevate(name)?;
        match f() {
            Ok(value) => {
                scoped.revert()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(revert) = scoped.revert() {
                    warn!(privilege = name, error = %revert, "failed to revert privilege");
                }
                Err(e)
            }
        }
    }

    /// Current state of `name` on the thread token, or the process token
    /// when the thread is not impersonating
    pub fn privilege_state(&self, name: &str) -> SecurityResult<PrivilegeState> {
        let id = self.resolve(name)?;
        let api = self.api();
        let token = match api
            .open_thread_token()
            .map_err(|code| SecurityError::from_os_code(code, "OpenThreadToken"))?
        {
            Some(token) => token,
            None => api
                .open_process_token()
                .map_err(|code| SecurityError::from_os_code(code, "OpenProcessToken"))?,
        };

        let queried = api.privilege_enabled(token, id);
        if let Err(code) = api.close_token(token) {
            warn!(token, code, "failed to close token after query");
        }

        let state = match queried.map_err(|code| SecurityError::from_os_code(code, "GetTokenInformation"))? {
            Some(true) => PrivilegeState::Enabled,
            Some(false) => PrivilegeState::Disabled,
            None => PrivilegeState::NotPresent,
        };
        debug!(privilege = name, ?state, "queried privilege state");
        Ok(state)
    }

    /// The calling thread's security context, if any guard holds one
    pub fn thread_context(&self) -> Option<ContextSnapshot> {
        self.inner.contexts.current()
    }

    /// References held on the calling thread's context
    pub fn thread_reference_count(&self) -> usize {
        self.inner.contexts.reference_count()
    }
}

impl fmt::Debug for PrivilegeElevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeElevator")
            .field("options", &self.inner.options)
            .field("resolver", &self.inner.resolver)
            .field("contexts", &self.inner.contexts)
            .finish()
    }
}

#[cfg(windows)]
lazy_static::lazy_static! {
    static ref DEFAULT_ELEVATOR: PrivilegeElevator = PrivilegeElevator::native();
}

/// Process-wide elevator over the native API
#[cfg(windows)]
pub fn default_elevator() -> &'static PrivilegeElevator {
    &DEFAULT_ELEVATOR
}

/// Enables `name` on the calling thread until the returned value is dropped
#[cfg(windows)]
pub fn elevate_privilege(name: &str) -> SecurityResult<ScopedPrivilege> {
    DEFAULT_ELEVATOR.elevate(name)
}
