//! Cachet Storage
//!
//! A typed cache with a Redis backend:
//!
//! ```ignore
//! use cachet_storage::{Cache, RedisBackedCache, RedisStore};
//!
//! let store = RedisStore::connect(&RedisConfig::from_env()?).await?;
//! let cache = RedisBackedCache::new(store, "test")?;
//!
//! cache.put("foo", &"FOO".to_string()).await?;
//! assert_eq!(cache.get::<String>("foo").await?, Some("FOO".to_string()));
//! ```
//!
//! In-memory and LMDB stores implement the same [`KeyValueStore`] trait and
//! can be injected in place of Redis.

pub mod cache;

pub use cache::{
    type_tag, Cache, CacheEntry, CacheName, CacheStats, Cacheable, Codec, InMemoryCache,
    JsonCodec, KeyValueStore, LmdbCache, LmdbStore, LmdbStoreError, MemoryStore, NamespacedKey,
    RedisBackedCache, RedisStore, StoreBackedCache,
};
pub use cachet_core::{CachetError, CachetResult};
