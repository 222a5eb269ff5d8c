//! Per-row mutation locks
//!
//! Read-modify-write sequences (favorite toggles, order-map rewrites,
//! insert-if-absent) are not atomic at the SQL level. Every such sequence on
//! the same logical row takes the row's lock first, so concurrent callers are
//! serialized instead of losing updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::schema::Table;

/// Entries kept before idle locks are pruned
const PRUNE_THRESHOLD: usize = 256;

/// Identity of a lockable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    /// A single row, by table and id
    Row(Table, i64),
    /// A whole table, for check-then-insert on natural keys
    Table(Table),
}

/// Registry of async mutexes keyed by [`RowKey`]
#[derive(Clone, Default)]
pub struct RowLocks {
    inner: Arc<Mutex<HashMap<RowKey, Arc<AsyncMutex<()>>>>>,
}

impl RowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: RowKey) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map.len() >= PRUNE_THRESHOLD {
            // Only the registry holds an idle lock
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(map.entry(key).or_default())
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: RowKey) -> OwnedMutexGuard<()> {
        self.entry(key).lock_owned().await
    }

    /// Lock several keys at once
    ///
    /// Keys are acquired in sorted order so two callers locking overlapping
    /// sets cannot deadlock.
    pub async fn lock_all(&self, keys: impl IntoIterator<Item = RowKey>) -> Vec<OwnedMutexGuard<()>> {
        let mut keys: Vec<RowKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Number of registered locks
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RowLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowLocks").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = RowLocks::new();
        let guard = locks.lock(RowKey::Row(Table::Tracks, 1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(RowKey::Row(Table::Tracks, 1)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        let _second = contender.await.expect("task panicked");
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = RowLocks::new();
        let _a = locks.lock(RowKey::Row(Table::Tracks, 1)).await;
        let _b = locks.lock(RowKey::Row(Table::Tracks, 2)).await;
        let _c = locks.lock(RowKey::Table(Table::Artists)).await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn lock_all_dedups() {
        let locks = RowLocks::new();
        let guards = locks
            .lock_all([
                RowKey::Row(Table::PlaylistConfigs, 3),
                RowKey::Row(Table::PlaylistConfigs, 1),
                RowKey::Row(Table::PlaylistConfigs, 3),
            ])
            .await;
        assert_eq!(guards.len(), 2);
    }
}
