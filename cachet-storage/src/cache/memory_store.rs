//! In-process key-value store.
//!
//! A `HashMap` behind an `RwLock`, with optional per-entry expiry. Expired
//! entries read as absent and are dropped on the next write that touches
//! them or on [`MemoryStore::purge_expired`].

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cachet_core::{StoreError, StoreResult};

use super::store::KeyValueStore;

const BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// In-memory store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, StoredValue>>,
}

fn lock_poisoned() -> StoreError {
    StoreError::unavailable(BACKEND, "lock poisoned")
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> StoreResult<usize> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| lock_poisoned())?;
        Ok(entries.values().filter(|v| v.is_live(now)).count())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> StoreResult<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| lock_poisoned())?;
        let before = entries.len();
        entries.retain(|_, v| v.is_live(now));
        Ok(before - entries.len())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| lock_poisoned())?;
        Ok(entries
            .get(key)
            .filter(|v| v.is_live(now))
            .map(|v| v.bytes.clone()))
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let stored = StoredValue {
            bytes: value.to_vec(),
            // A ttl past the end of the clock never expires.
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        let mut entries = self.entries.write().map_err(|_| lock_poisoned())?;
        entries.insert(key.to_vec(), stored);
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| lock_poisoned())?;
        Ok(entries.remove(key).is_some_and(|v| v.is_live(now)))
    }

    async fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        let now = Instant::now();
        let entries = self.entries.read().map_err(|_| lock_poisoned())?;
        Ok(entries.get(key).is_some_and(|v| v.is_live(now)))
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> StoreResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().map_err(|_| lock_poisoned())?;
        let mut removed = 0u64;
        entries.retain(|key, value| {
            if key.starts_with(prefix) {
                if value.is_live(now) {
                    removed += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.entries.read().map(|_| ()).map_err(|_| lock_poisoned())
    }
}
