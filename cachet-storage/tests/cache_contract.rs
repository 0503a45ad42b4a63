//! Behaviour every store-backed cache must share, run against the
//! in-memory and LMDB stores.

use std::sync::Arc;
use std::time::Duration;

use cachet_storage::{Cache, KeyValueStore, LmdbStore, MemoryStore, StoreBackedCache};
use cachet_test_utils::assertions::{assert_deserialization_error, assert_serialization_error};
use cachet_test_utils::generators::{arb_cache_name, arb_key, arb_profile};
use cachet_test_utils::{fixtures, init_test_tracing, Account, Profile};
use proptest::prelude::*;
use tempfile::TempDir;

async fn check_put_then_get<S: KeyValueStore>(store: S) {
    let cache = StoreBackedCache::new(store, "test").expect("cache creation should succeed");

    cache
        .put("foo", &"FOO".to_string())
        .await
        .expect("put should succeed");
    assert_eq!(
        cache.get::<String>("foo").await.expect("get should succeed"),
        Some("FOO".to_string())
    );
    assert_eq!(cache.get::<String>("bar").await.expect("get should succeed"), None);
}

async fn check_structured_values<S: KeyValueStore>(store: S) {
    let cache = StoreBackedCache::new(store, "profiles").expect("cache creation should succeed");

    cache.put("alice", &fixtures::alice()).await.expect("put should succeed");
    cache.put("bob", &fixtures::bob()).await.expect("put should succeed");

    assert_eq!(
        cache.get::<Profile>("alice").await.expect("get should succeed"),
        Some(fixtures::alice())
    );
    assert_eq!(
        cache.get::<Profile>("bob").await.expect("get should succeed"),
        Some(fixtures::bob())
    );

    let list = vec![fixtures::alice(), fixtures::bob()];
    cache.put("team", &list).await.expect("put should succeed");
    assert_eq!(
        cache.get::<Vec<Profile>>("team").await.expect("get should succeed"),
        Some(list)
    );
}

async fn check_type_mismatch<S: KeyValueStore>(store: S) {
    let cache = StoreBackedCache::new(store, "test").expect("cache creation should succeed");

    cache.put("alice", &fixtures::alice()).await.expect("put should succeed");
    assert_deserialization_error(&cache.get::<Account>("alice").await);
    assert_deserialization_error(&cache.get::<u64>("alice").await);

    cache.put("acct", &fixtures::account()).await.expect("put should succeed");
    assert_deserialization_error(&cache.get::<Profile>("acct").await);
}

async fn check_isolation<S: KeyValueStore>(store: S) {
    let store = Arc::new(store);
    let users = StoreBackedCache::new(Arc::clone(&store), "users").expect("users cache");
    let sessions = StoreBackedCache::new(Arc::clone(&store), "sessions").expect("sessions cache");

    users.put("1", &fixtures::alice()).await.expect("put should succeed");
    sessions.put("1", &"token".to_string()).await.expect("put should succeed");

    assert_eq!(
        users.get::<Profile>("1").await.expect("get should succeed"),
        Some(fixtures::alice())
    );
    assert_eq!(
        sessions.get::<String>("1").await.expect("get should succeed"),
        Some("token".to_string())
    );

    assert_eq!(sessions.clear().await.expect("clear should succeed"), 1);
    assert!(users.contains("1").await.expect("contains should succeed"));
    assert!(!sessions.contains("1").await.expect("contains should succeed"));
}

async fn check_separator_in_key<S: KeyValueStore>(store: S) {
    let store = Arc::new(store);
    let a = StoreBackedCache::new(Arc::clone(&store), "a").expect("cache a");
    let ab = StoreBackedCache::new(Arc::clone(&store), "a.b").expect("cache a.b");

    a.put("b:c", &1u32).await.expect("put should succeed");
    ab.put("c", &2u32).await.expect("put should succeed");

    assert_eq!(a.get::<u32>("b:c").await.expect("get should succeed"), Some(1));
    assert_eq!(ab.get::<u32>("c").await.expect("get should succeed"), Some(2));
    assert_eq!(a.get::<u32>("c").await.expect("get should succeed"), None);
}

async fn check_ttl<S: KeyValueStore>(store: S) {
    let cache = StoreBackedCache::new(store, "ttl").expect("cache creation should succeed");

    cache
        .put_with_ttl("short", &1u8, Duration::from_millis(30))
        .await
        .expect("put should succeed");
    cache.put("long", &2u8).await.expect("put should succeed");

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.get::<u8>("short").await.expect("get should succeed"), None);
    assert_eq!(cache.get::<u8>("long").await.expect("get should succeed"), Some(2));
}

async fn check_serialization_failure<S: KeyValueStore>(store: S) {
    let cache = StoreBackedCache::new(store, "test").expect("cache creation should succeed");
    let value: std::collections::BTreeMap<Vec<u8>, u8> =
        std::collections::BTreeMap::from([(vec![1, 2], 3)]);

    assert_serialization_error(&cache.put("bad", &value).await);
    assert!(!cache.contains("bad").await.expect("contains should succeed"));
}

async fn run_contract<F, S>(make_store: F)
where
    F: Fn() -> S,
    S: KeyValueStore,
{
    init_test_tracing();
    check_put_then_get(make_store()).await;
    check_structured_values(make_store()).await;
    check_type_mismatch(make_store()).await;
    check_isolation(make_store()).await;
    check_separator_in_key(make_store()).await;
    check_ttl(make_store()).await;
    check_serialization_failure(make_store()).await;
}

#[tokio::test]
async fn test_memory_store_contract() {
    run_contract(MemoryStore::new).await;
}

#[tokio::test]
async fn test_lmdb_store_contract() {
    let dirs: std::sync::Mutex<Vec<TempDir>> = std::sync::Mutex::new(Vec::new());
    run_contract(|| {
        let dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbStore::open(dir.path(), 10).expect("store creation should succeed");
        dirs.lock().expect("dirs lock").push(dir);
        store
    })
    .await;
}

#[tokio::test]
async fn test_lmdb_cache_survives_reopen() {
    let dir = TempDir::new().expect("TempDir creation should succeed");
    {
        let store = LmdbStore::open(dir.path(), 10).expect("open should succeed");
        let cache = StoreBackedCache::new(store, "profiles").expect("cache creation");
        cache.put("alice", &fixtures::alice()).await.expect("put should succeed");
    }

    let store = LmdbStore::open(dir.path(), 10).expect("reopen should succeed");
    let cache = StoreBackedCache::new(store, "profiles").expect("cache creation");
    assert_eq!(
        cache.get::<Profile>("alice").await.expect("get should succeed"),
        Some(fixtures::alice())
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_put_then_get_returns_value(
        name in arb_cache_name(),
        key in arb_key(),
        profile in arb_profile(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime creation should succeed");

        let read = rt.block_on(async {
            let cache = StoreBackedCache::new(MemoryStore::new(), &name)
                .expect("generated names are valid");
            cache.put(&key, &profile).await.expect("put should succeed");
            cache.get::<Profile>(&key).await.expect("get should succeed")
        });

        prop_assert_eq!(read, Some(profile));
    }

    #[test]
    fn prop_last_write_wins(
        key in arb_key(),
        values in prop::collection::vec(any::<i64>(), 1..8),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime creation should succeed");

        let read = rt.block_on(async {
            let cache = StoreBackedCache::new(MemoryStore::new(), "test")
                .expect("cache creation should succeed");
            for v in &values {
                cache.put(&key, v).await.expect("put should succeed");
            }
            cache.get::<i64>(&key).await.expect("get should succeed")
        });

        prop_assert_eq!(read, values.last().copied());
    }
}
