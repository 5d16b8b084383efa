//! Keyed async mutexes
//!
//! One `tokio::sync::Mutex` per key, created on first use and dropped once
//! the last holder or waiter releases it, so the map only ever contains
//! keys that are currently contended.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OwnedMutexGuard;
use tracing::warn;

type Slots<K> = HashMap<K, Arc<tokio::sync::Mutex<()>>>;

pub(crate) struct KeyedLocks<K> {
    slots: Mutex<Slots<K>>,
}

impl<K: Hash + Eq + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`
    pub(crate) async fn lock(&self, key: K) -> KeyedGuard<'_, K> {
        let slot = self.slots().entry(key.clone()).or_default().clone();
        let guard = slot.lock_owned().await;
        KeyedGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots().len()
    }

    // The map is only a cache of mutexes; a panic while holding it leaves
    // nothing half-written worth propagating.
    fn slots(&self) -> MutexGuard<'_, Slots<K>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("keyed lock table was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

/// Held lock on one key; released on drop
pub(crate) struct KeyedGuard<'a, K: Hash + Eq + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Hash + Eq + Clone> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        // Release the mutex before inspecting the reference count
        drop(self.guard.take());

        let mut slots = self.locks.slots();
        if let Some(slot) = slots.get(&self.key)
            && Arc::strong_count(slot) == 1
        {
            slots.remove(&self.key);
        }
    }
}
