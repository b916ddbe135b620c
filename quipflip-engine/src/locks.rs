//! Keyed async locks serialising balance, phraseset, and queue mutations.
//! Backed by an in-process `dashmap` registry, which is correct for a
//! single API instance; a multi-instance deployment would need these
//! upgraded to a distributed lock (e.g. over the `redis` connection
//! already held for health checks).

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A registry of one mutex per key, created lazily and never removed — the
/// key space (player ids, phraseset ids) is bounded by what's in the
/// database, so the map settles at a fixed size rather than growing forever.
pub struct KeyedLocks<K> {
    mutexes: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            mutexes: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, blocking until held. The returned guard
    /// owns the lock independent of any borrow, so it can be held across
    /// `.await` points inside the caller's transaction.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let mutex = self
            .mutexes
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

/// The three named lock spaces: per-player, per-phraseset, and a single
/// per-queue lock guarding dequeue.
pub struct Locks {
    pub players: KeyedLocks<uuid::Uuid>,
    pub phrasesets: KeyedLocks<uuid::Uuid>,
    pub queue: KeyedLocks<()>,
}

impl Default for Locks {
    fn default() -> Self {
        Self {
            players: KeyedLocks::new(),
            phrasesets: KeyedLocks::new(),
            queue: KeyedLocks::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_key_serialises() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let l1 = locks.lock(1).await;
        let order2 = order.clone();
        let handle = tokio::spawn(async move {
            order2.lock().await.push("waiting");
        });
        handle.await.unwrap();
        order.lock().await.push("held");
        drop(l1);

        assert_eq!(*order.lock().await, vec!["waiting", "held"]);
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();
        let g1 = locks.lock(1).await;
        let g2 = locks.lock(2).await;
        drop(g1);
        drop(g2);
    }
}
