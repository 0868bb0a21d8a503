//! Per-match exclusive locks serializing join, submit and expiry finalization.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Guard held for the whole load-modify-write of one match.
pub type MatchGuard = OwnedMutexGuard<()>;

/// Registry of match locks keyed by match id. Different matches never contend.
#[derive(Default)]
pub struct MatchLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl MatchLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `match_id`.
    pub async fn acquire(&self, match_id: Uuid) -> MatchGuard {
        // The map shard guard must be gone before awaiting.
        let lock = self
            .locks
            .entry(match_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Forget the lock of a finished match.
    ///
    /// Finished is terminal, so a waiter still holding the old lock only observes the final state.
    pub fn release_finished(&self, match_id: Uuid) {
        self.locks.remove(&match_id);
    }

    /// Number of matches with a registered lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no match currently has a lock entry.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
