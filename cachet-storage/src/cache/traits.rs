//! The cache contract and its statistics.

use std::time::Duration;

use async_trait::async_trait;
use cachet_core::CachetResult;

use super::codec::{CacheEntry, Cacheable};
use super::namespace::CacheName;

/// A named, typed cache.
///
/// Every key is scoped to [`Cache::name`], so caches with different names
/// can share one store without seeing each other's entries.
///
/// A miss is `Ok(None)`, never an error. Errors are reserved for values
/// that cannot be encoded, stored bytes that do not decode as the requested
/// type, and stores that cannot be reached. Nothing is retried.
///
/// # Example
///
/// ```ignore
/// cache.put("foo", &"FOO".to_string()).await?;
/// assert_eq!(cache.get::<String>("foo").await?, Some("FOO".to_string()));
/// assert_eq!(cache.get::<String>("bar").await?, None);
/// ```
#[async_trait]
pub trait Cache: Send + Sync {
    /// The namespace of this cache.
    fn name(&self) -> &CacheName;

    /// Store a value, replacing any previous value for the key.
    ///
    /// Applies the cache's default TTL if one is configured.
    async fn put<T: Cacheable>(&self, key: &str, value: &T) -> CachetResult<()>;

    /// Store a value that expires after `ttl`.
    async fn put_with_ttl<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CachetResult<()>;

    /// Fetch a value as `T`.
    async fn get<T: Cacheable>(&self, key: &str) -> CachetResult<Option<T>> {
        Ok(self.get_entry::<T>(key).await?.map(CacheEntry::into_value))
    }

    /// Fetch a value as `T` together with the time it was written.
    async fn get_entry<T: Cacheable>(&self, key: &str) -> CachetResult<Option<CacheEntry<T>>>;

    /// Whether a live entry exists for the key, regardless of its type.
    async fn contains(&self, key: &str) -> CachetResult<bool>;

    /// Remove one entry. Returns whether it existed.
    async fn evict(&self, key: &str) -> CachetResult<bool>;

    /// Remove every entry in this cache's namespace. Entries of other caches
    /// sharing the store are untouched.
    async fn clear(&self) -> CachetResult<u64>;

    /// Counters for this cache instance.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found an entry.
    pub hits: u64,
    /// Number of reads that found nothing.
    pub misses: u64,
    /// Number of successful writes.
    pub writes: u64,
    /// Number of entries removed through `evict` or `clear`.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
