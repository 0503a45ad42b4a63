//! Typed cache layer.
//!
//! The pieces, from the caller inwards:
//!
//! - [`Cache`]: the contract callers program against
//! - [`StoreBackedCache`]: the one implementation, generic over store and codec
//! - [`NamespacedKey`]: turns `(cache name, key)` into the physical store key
//! - [`Codec`] / [`JsonCodec`]: turns values into bytes and back
//! - [`KeyValueStore`]: raw byte storage, implemented for Redis, memory and LMDB
//!
//! # Key Format
//!
//! Physical keys are `{cache name}:{key}`. Cache names may not contain the
//! separator, so two caches on one store never collide.

mod codec;
mod lmdb_store;
mod memory_store;
mod namespace;
mod redis_store;
mod store;
mod store_backed;
mod traits;

pub use codec::{type_tag, CacheEntry, Cacheable, Codec, JsonCodec};
pub use lmdb_store::{LmdbStore, LmdbStoreError};
pub use memory_store::MemoryStore;
pub use namespace::{CacheName, NamespacedKey, MAX_CACHE_NAME_LEN, SEPARATOR};
pub use redis_store::RedisStore;
pub use store::KeyValueStore;
pub use store_backed::{InMemoryCache, LmdbCache, RedisBackedCache, StoreBackedCache};
pub use traits::{Cache, CacheStats};
