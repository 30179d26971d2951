//! Application state management for Tauri.
//!
//! Provides thread-safe shared state accessible from Tauri commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Split Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Cancellation tokens of in-flight splits, keyed by source path.
///
/// The lock is never held across an await, so a std mutex is enough and lets
/// [`SplitGuard`] release its entry from `Drop`.
pub struct SplitRegistry {
    tokens: Mutex<HashMap<PathBuf, CancellationToken>>,
}

impl SplitRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a split of `source`.
    ///
    /// The entry lives as long as the returned guard. It is removed under the
    /// key resolved here, even if the source is later moved or deleted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyRunning` if the same source is being split.
    pub fn begin(&self, source: &Path) -> Result<SplitGuard<'_>, AppError> {
        let key = registry_key(source);
        let mut tokens = self.lock();
        if tokens.contains_key(&key) {
            return Err(AppError::AlreadyRunning { path: key });
        }
        let token = CancellationToken::new();
        tokens.insert(key.clone(), token.clone());
        Ok(SplitGuard {
            registry: self,
            key,
            token,
        })
    }

    /// Signals cancellation for `source`. Returns false if nothing was running.
    pub fn cancel(&self, source: &Path) -> bool {
        let key = registry_key(source);
        match self.lock().get(&key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, source: &Path) -> bool {
        let key = registry_key(source);
        self.lock().contains_key(&key)
    }

    fn release(&self, key: &Path) {
        self.lock().remove(key);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, CancellationToken>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SplitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration of one running split. Dropping it frees the source.
pub struct SplitGuard<'a> {
    registry: &'a SplitRegistry,
    key: PathBuf,
    token: CancellationToken,
}

impl SplitGuard<'_> {
    /// Token fired by [`SplitRegistry::cancel`].
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolved path the split is registered under.
    pub fn key(&self) -> &Path {
        &self.key
    }
}

impl Drop for SplitGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// Resolves symlinks and relative segments so two spellings of one file share
/// an entry. Paths that cannot be resolved are used as given.
fn registry_key(source: &Path) -> PathBuf {
    std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf())
}

// ─────────────────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────────────────

/// Global application state shared across all Tauri commands.
///
/// This state is managed by Tauri and injected into commands via
/// `tauri::State<AppState>`.
#[derive(Default)]
pub struct AppState {
    /// Splits currently running.
    pub splits: SplitRegistry,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
