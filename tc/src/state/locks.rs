//! Keyed async locks
//!
//! Turns on the same conversation queue behind one async mutex, and task
//! writes for the same owner queue behind another. Different keys never wait
//! on each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::ConversationId;

/// Table of async mutexes created on first use
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// One chat turn at a time per conversation
pub type ConversationLocks = KeyedLocks<ConversationId>;

/// One task writer at a time per owner
pub type OwnerLocks = KeyedLocks<String>;

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Display> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `key`
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only the table still references are idle
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.clone()).or_default().clone()
        };
        debug!(%key, "KeyedLocks::acquire: waiting");
        lock.lock_owned().await
    }

    /// Number of keys with a holder or a waiter
    pub fn active(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| Arc::strong_count(lock) > 1).count()
    }
}
