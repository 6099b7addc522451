//! Per-scope locking and the halted-scope registry.
//!
//! Each scope gets its own `RwLock`. Mutations hold it exclusively for the
//! whole Validate, Reserve, Write sequence; queries hold it shared when the
//! Node Store cannot guarantee consistent reads on its own. Locks of
//! different scopes are independent, so mutations on different scopes run
//! in parallel.
//!
//! The guarded data is `()`, so a poisoned lock carries no broken state and
//! is simply re-entered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::scope::ScopeId;

/// Lock table shared by every operation of one [`Forest`](crate::Forest).
#[derive(Debug, Default)]
pub struct ScopeLocks {
    table: Mutex<HashMap<ScopeId, Arc<RwLock<()>>>>,
    halted: Mutex<HashMap<ScopeId, String>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, scope: &ScopeId) -> Arc<RwLock<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(scope.clone()).or_default().clone()
    }

    /// Runs `f` while holding the scope's exclusive lock.
    pub fn with_exclusive<T>(&self, scope: &ScopeId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(scope);
        let _guard = lock.write().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Runs `f` while holding the scope's shared lock.
    pub fn with_shared<T>(&self, scope: &ScopeId, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(scope);
        let _guard = lock.read().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Marks a scope as halted. Later mutations are refused until
    /// [`clear`](Self::clear) is called.
    pub fn halt(&self, scope: &ScopeId, reason: impl Into<String>) {
        let mut halted = self.halted.lock().unwrap_or_else(PoisonError::into_inner);
        halted.entry(scope.clone()).or_insert_with(|| reason.into());
    }

    /// The reason a scope was halted, if it is.
    pub fn halted_reason(&self, scope: &ScopeId) -> Option<String> {
        let halted = self.halted.lock().unwrap_or_else(PoisonError::into_inner);
        halted.get(scope).cloned()
    }

    pub fn is_halted(&self, scope: &ScopeId) -> bool {
        self.halted_reason(scope).is_some()
    }

    /// Lifts the halt on a scope. Returns true if it was halted.
    pub fn clear(&self, scope: &ScopeId) -> bool {
        let mut halted = self.halted.lock().unwrap_or_else(PoisonError::into_inner);
        halted.remove(scope).is_some()
    }

    /// Every halted scope in sorted order.
    pub fn halted(&self) -> Vec<ScopeId> {
        let halted = self.halted.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scopes: Vec<ScopeId> = halted.keys().cloned().collect();
        scopes.sort();
        scopes
    }
}
