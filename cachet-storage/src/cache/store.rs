//! Raw key-value store contract.
//!
//! This is the seam between a cache and whatever actually holds the bytes.
//! A store deals only in byte keys and byte values; namespacing and typing
//! happen above it in [`StoreBackedCache`](super::StoreBackedCache).
//!
//! Stores are handed to caches already connected. A cache never opens,
//! reconnects or closes the connection behind a store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cachet_core::StoreResult;

/// Byte-level key-value store.
///
/// Implementations must be safe to call concurrently from many tasks through
/// a shared reference.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name used in errors and logs (e.g. `"redis"`).
    fn backend(&self) -> &'static str;

    /// Fetch a value. `Ok(None)` when the key is absent or expired.
    async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Store a value, replacing any previous one. With `ttl` the entry
    /// expires after that duration; without it the entry does not expire.
    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StoreResult<()>;

    /// Remove a key. Returns whether a live entry was removed.
    async fn delete(&self, key: &[u8]) -> StoreResult<bool>;

    /// Whether a live entry exists for the key.
    async fn exists(&self, key: &[u8]) -> StoreResult<bool>;

    /// Remove every key starting with `prefix`. Returns how many were removed.
    ///
    /// Not atomic with respect to concurrent writers on stores that scan
    /// incrementally.
    async fn delete_prefix(&self, prefix: &[u8]) -> StoreResult<u64>;

    /// Round-trip to the store without touching data.
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> StoreResult<u64> {
        (**self).delete_prefix(prefix).await
    }

    async fn ping(&self) -> StoreResult<()> {
        (**self).ping().await
    }
}
