//! Per-key mutual exclusion
//!
//! A sharded lock table: each presence key hashes to one of a fixed number
//! of async mutexes. Two concurrent scans for the same key serialize on the
//! same shard; unrelated keys almost always proceed in parallel. The guard
//! is held across the duplicate-filter check and the toggle read-decide-write,
//! so the loser of a race re-evaluates against the winner's update.

use crate::db::presence::PresenceKey;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

/// Default shard count for the pipeline's lock table
pub const DEFAULT_SHARDS: usize = 64;

/// Sharded per-key lock table
pub struct KeyLocks {
    shards: Vec<Mutex<()>>,
}

impl KeyLocks {
    pub fn new(shard_count: usize) -> Self {
        assert!(shard_count > 0, "lock table needs at least one shard");
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(())).collect(),
        }
    }

    fn shard_index(&self, key: &PresenceKey) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Acquire the exclusive critical section for a key
    pub async fn lock(&self, key: &PresenceKey) -> MutexGuard<'_, ()> {
        self.shards[self.shard_index(key)].lock().await
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(DEFAULT_SHARDS)
    }
}
