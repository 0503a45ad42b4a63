//! [`Cache`] implementation over any [`KeyValueStore`].
//!
//! Composes the namespacer and a codec in front of an injected store:
//!
//! - `put`: namespace the key, encode the value, `set` it
//! - `get`: namespace the key, `get` it, decode if present
//!
//! Which store is injected decides the variant: [`RedisBackedCache`] talks to
//! a Redis server over the network, [`InMemoryCache`] keeps entries in the
//! process and [`LmdbCache`] keeps them in an LMDB file.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cachet_core::{CacheConfig, CachetError, CachetResult, ConfigError, HealthCheck};
use chrono::Utc;
use redis::aio::{ConnectionLike, MultiplexedConnection};

use super::codec::{CacheEntry, Cacheable, Codec, JsonCodec};
use super::lmdb_store::LmdbStore;
use super::memory_store::MemoryStore;
use super::namespace::{CacheName, NamespacedKey};
use super::redis_store::RedisStore;
use super::store::KeyValueStore;
use super::traits::{Cache, CacheStats};

/// Cache over a Redis connection.
pub type RedisBackedCache<C = MultiplexedConnection> = StoreBackedCache<RedisStore<C>>;

/// Cache over a process-local map.
pub type InMemoryCache = StoreBackedCache<MemoryStore>;

/// Cache over an LMDB file.
pub type LmdbCache = StoreBackedCache<LmdbStore>;

/// A named cache over an injected store.
///
/// The cache has no lifecycle of its own: it is ready once constructed and
/// holds nothing but its name, codec, store handle and counters. To share a
/// store between several caches, inject an `Arc` of it.
pub struct StoreBackedCache<S, C = JsonCodec> {
    store: S,
    codec: C,
    name: CacheName,
    default_ttl: Option<Duration>,
    stats: Arc<RwLock<CacheStats>>,
}

impl<S: KeyValueStore> StoreBackedCache<S, JsonCodec> {
    /// Create a cache with the JSON codec and no expiry.
    pub fn new(store: S, name: &str) -> CachetResult<Self> {
        Self::with_config(store, &CacheConfig::new(name))
    }

    /// Create a cache with the JSON codec from a config.
    pub fn with_config(store: S, config: &CacheConfig) -> CachetResult<Self> {
        Self::with_codec(store, JsonCodec, config)
    }
}

impl<C> StoreBackedCache<RedisStore<C>, JsonCodec>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    /// Create a Redis-backed cache from an established connection.
    pub fn from_connection(conn: C, name: &str) -> CachetResult<Self> {
        Self::new(RedisStore::new(conn), name)
    }
}

impl StoreBackedCache<LmdbStore, JsonCodec> {
    /// Open (or create) an LMDB file at `path` and put a cache over it.
    pub fn open_lmdb<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        config: &CacheConfig,
    ) -> CachetResult<Self> {
        let store = LmdbStore::open(path, max_size_mb)?;
        Self::with_config(store, config)
    }
}

impl<S: KeyValueStore, C: Codec> StoreBackedCache<S, C> {
    /// Create a cache with an explicit codec.
    pub fn with_codec(store: S, codec: C, config: &CacheConfig) -> CachetResult<Self> {
        config.validate()?;
        let name = CacheName::new(config.name.as_str())?;

        tracing::debug!(
            cache = %name,
            backend = store.backend(),
            codec = codec.name(),
            default_ttl = ?config.default_ttl,
            "Cache created"
        );

        Ok(Self {
            store,
            codec,
            name,
            default_ttl: config.default_ttl,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Ping the store and report the result. Never fails itself.
    pub async fn health_check(&self) -> HealthCheck {
        let started = Instant::now();
        let result = self.store.ping().await;
        let elapsed_ms = started.elapsed().as_millis() as i64;

        let check = match result {
            Ok(()) => HealthCheck::healthy(self.name.as_str()),
            Err(e) => HealthCheck::unhealthy(self.name.as_str(), e.to_string()),
        };
        check
            .with_response_time(elapsed_ms)
            .with_metadata("backend", serde_json::json!(self.store.backend()))
    }

    fn physical_key(&self, key: &str) -> CachetResult<Vec<u8>> {
        Ok(NamespacedKey::new(&self.name, key)?.encode())
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }

    async fn write<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> CachetResult<()> {
        let physical = self.physical_key(key)?;
        let bytes = self.codec.encode(value, Utc::now())?;

        self.store.set(&physical, &bytes, ttl).await.map_err(|e| {
            tracing::warn!(cache = %self.name, key, error = %e, "Cache write failed");
            CachetError::from(e)
        })?;

        self.record(|s| s.writes += 1);
        tracing::trace!(cache = %self.name, key, bytes = bytes.len(), ttl = ?ttl, "Cache put");
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValueStore, C: Codec> Cache for StoreBackedCache<S, C> {
    fn name(&self) -> &CacheName {
        &self.name
    }

    async fn put<T: Cacheable>(&self, key: &str, value: &T) -> CachetResult<()> {
        self.write(key, value, self.default_ttl).await
    }

    async fn put_with_ttl<T: Cacheable>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CachetResult<()> {
        if ttl.as_millis() == 0 {
            return Err(CachetError::Config(ConfigError::InvalidValue {
                field: "ttl".to_string(),
                value: format!("{:?}", ttl),
                reason: "ttl must be at least 1ms".to_string(),
            }));
        }
        self.write(key, value, Some(ttl)).await
    }

    async fn get_entry<T: Cacheable>(&self, key: &str) -> CachetResult<Option<CacheEntry<T>>> {
        let physical = self.physical_key(key)?;

        let stored = self.store.get(&physical).await.map_err(|e| {
            tracing::warn!(cache = %self.name, key, error = %e, "Cache read failed");
            CachetError::from(e)
        })?;

        match stored {
            Some(bytes) => {
                let entry = self.codec.decode::<T>(&bytes).map_err(|e| {
                    tracing::debug!(cache = %self.name, key, error = %e, "Cache decode failed");
                    CachetError::from(e)
                })?;
                self.record(|s| s.hits += 1);
                tracing::trace!(cache = %self.name, key, "Cache hit");
                Ok(Some(entry))
            }
            None => {
                self.record(|s| s.misses += 1);
                tracing::trace!(cache = %self.name, key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn contains(&self, key: &str) -> CachetResult<bool> {
        let physical = self.physical_key(key)?;
        Ok(self.store.exists(&physical).await?)
    }

    async fn evict(&self, key: &str) -> CachetResult<bool> {
        let physical = self.physical_key(key)?;
        let removed = self.store.delete(&physical).await?;
        if removed {
            self.record(|s| s.evictions += 1);
        }
        Ok(removed)
    }

    async fn clear(&self) -> CachetResult<u64> {
        let prefix = NamespacedKey::namespace_prefix(&self.name);
        let removed = self.store.delete_prefix(&prefix).await?;
        self.record(|s| s.evictions += removed);
        tracing::debug!(cache = %self.name, removed, "Cache cleared");
        Ok(removed)
    }

    fn stats(&self) -> CacheStats {
        match self.stats.read() {
            Ok(stats) => stats.clone(),
            Err(_) => CacheStats::default(),
        }
    }
}
