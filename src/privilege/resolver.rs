//! Privilege name resolution with a process-wide cache

use crate::core::types::{PrivilegeId, SecurityError, SecurityResult};
use crate::platform::{OsCode, SecurityApi};
use crate::windows::utils::error_codes::{ErrorCode, ERROR_NO_SUCH_PRIVILEGE};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

#[derive(Debug, Default)]
struct ResolverCache {
    by_name: HashMap<String, PrivilegeId>,
    by_id: HashMap<PrivilegeId, String>,
}

impl ResolverCache {
    // Never overwrites: an id is invariant for a given name
    fn insert(&mut self, name: &str, id: PrivilegeId) {
        self.by_name.entry(name.to_string()).or_insert(id);
        self.by_id.entry(id).or_insert_with(|| name.to_string());
    }
}

/// Maps privilege names to [`PrivilegeId`]s, caching both directions.
///
/// Lookups take the shared lock; a miss takes the exclusive lock, checks
/// again and only then asks the OS, so entries are never duplicated.
pub struct PrivilegeNameResolver {
    api: Arc<dyn SecurityApi>,
    cache: RwLock<ResolverCache>,
}

impl PrivilegeNameResolver {
    pub fn new(api: Arc<dyn SecurityApi>) -> Self {
        PrivilegeNameResolver {
            api,
            cache: RwLock::new(ResolverCache::default()),
        }
    }

    /// Resolves a privilege name, consulting the OS at most once per name
    pub fn resolve(&self, name: &str) -> SecurityResult<PrivilegeId> {
        if let Some(id) = self.read().by_name.get(name) {
            trace!(privilege = name, %id, "privilege cache hit");
            return Ok(*id);
        }

        let mut cache = self.write();
        if let Some(id) = cache.by_name.get(name) {
            return Ok(*id);
        }

        let id = self
            .api
            .lookup_privilege_value(name)
            .map_err(|code| lookup_error(code, name))?;
        cache.insert(name, id);
        debug!(privilege = name, %id, "resolved privilege");
        Ok(id)
    }

    /// Reverse lookup, from the cache when possible
    pub fn name_of(&self, id: PrivilegeId) -> SecurityResult<String> {
        if let Some(name) = self.read().by_id.get(&id) {
            return Ok(name.clone());
        }

        let name = self
            .api
            .lookup_privilege_name(id)
            .map_err(|code| lookup_error(code, &id.to_string()))?;
        self.write().insert(&name, id);
        Ok(name)
    }

    /// Resolves every name up front; stops at the first failure
    pub fn preload<'a, I>(&self, names: I) -> SecurityResult<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut count = 0;
        for name in names {
            self.resolve(name)?;
            count += 1;
        }
        Ok(count)
    }

    /// Whether `name` has already been resolved
    pub fn contains(&self, name: &str) -> bool {
        self.read().by_name.contains_key(name)
    }

    /// Number of cached names
    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, ResolverCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ResolverCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for PrivilegeNameResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeNameResolver")
            .field("cached", &self.len())
            .finish()
    }
}

fn lookup_error(code: OsCode, name: &str) -> SecurityError {
    if code == ERROR_NO_SUCH_PRIVILEGE || ErrorCode::from(code) == ErrorCode::InvalidName {
        SecurityError::UnknownPrivilege(name.to_string())
    } else {
        SecurityError::from_os_code(code, format!("LookupPrivilegeValue({})", name))
    }
}
