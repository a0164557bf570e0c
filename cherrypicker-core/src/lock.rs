//! Per-repository serialization of git work
//!
//! Every repository has exactly one shared local clone, so all git-mutating
//! work against it must run one at a time. Different repositories never
//! contend with each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, trace};

use crate::types::RepoKey;

/// Registry of one async mutex per repository
///
/// Entries are created on first use and kept for the life of the manager.
#[derive(Debug, Default)]
pub struct RepoLockManager {
    locks: Mutex<HashMap<RepoKey, Arc<AsyncMutex<()>>>>,
}

impl RepoLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, key: &RepoKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Wait for exclusive use of the repository's working copy
    ///
    /// The lock is released when the returned guard is dropped, whichever way
    /// the holder exits.
    pub async fn acquire(&self, key: &RepoKey) -> RepoGuard {
        let lock = self.lock_for(key);
        debug!(repo = %key, "Waiting for repository lock");
        let guard = lock.lock_owned().await;
        debug!(repo = %key, "Acquired repository lock");

        RepoGuard {
            key: key.clone(),
            _guard: guard,
        }
    }

    /// Number of repositories seen so far
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one repository's working copy
#[derive(Debug)]
pub struct RepoGuard {
    key: RepoKey,
    _guard: OwnedMutexGuard<()>,
}

impl RepoGuard {
    pub fn key(&self) -> &RepoKey {
        &self.key
    }
}

impl Drop for RepoGuard {
    fn drop(&mut self) {
        trace!(repo = %self.key, "Released repository lock");
    }
}
