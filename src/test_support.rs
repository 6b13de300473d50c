//! Shared test utilities used across multiple test modules.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Serializes environment mutation across all test modules in the crate.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Holds the env lock and restores the previous values on drop.
///
/// A test must hold at most one guard at a time; chain [`Self::and_set`] /
/// [`Self::and_unset`] to cover several variables under the same lock.
pub(crate) struct EnvVarGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvVarGuard {
    fn acquire() -> Self {
        Self {
            saved: Vec::new(),
            _lock: ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Set `key` to `value` for the guard's lifetime.
    pub(crate) fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        Self::acquire().and_set(key, value)
    }

    /// Remove `key` for the guard's lifetime.
    pub(crate) fn unset(key: &'static str) -> Self {
        Self::acquire().and_unset(key)
    }

    /// Also set `key` to `value` under the already-held lock.
    pub(crate) fn and_set(mut self, key: &'static str, value: impl AsRef<OsStr>) -> Self {
        self.saved.push((key, std::env::var_os(key)));
        // SAFETY: test-only env mutation guarded by ENV_LOCK.
        unsafe { std::env::set_var(key, value) };
        self
    }

    /// Also remove `key` under the already-held lock.
    pub(crate) fn and_unset(mut self, key: &'static str) -> Self {
        self.saved.push((key, std::env::var_os(key)));
        // SAFETY: test-only env mutation guarded by ENV_LOCK.
        unsafe { std::env::remove_var(key) };
        self
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        while let Some((key, saved)) = self.saved.pop() {
            match saved {
                // SAFETY: test-only env mutation guarded by ENV_LOCK.
                Some(value) => unsafe { std::env::set_var(key, value) },
                // SAFETY: test-only env mutation guarded by ENV_LOCK.
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}
