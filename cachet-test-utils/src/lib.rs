//! Cachet Test Utilities
//!
//! Shared test infrastructure for the Cachet workspace:
//! - Proptest generators for cache names, keys and values
//! - Fixture records for typed round trips
//! - Assertions over `CachetError` variants
//! - Tracing and Redis environment helpers

pub use cachet_core::{CachetError, CachetResult, CodecError, RedisConfig, StoreError};

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Install a test-friendly tracing subscriber once per process.
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Redis settings for integration tests, or `None` when `CACHET_REDIS_URL`
/// is unset and the tests should be skipped.
pub fn redis_config_from_env() -> Option<RedisConfig> {
    std::env::var("CACHET_REDIS_URL").ok()?;
    RedisConfig::from_env().ok()
}

/// A cache name no other test run will use.
///
/// Integration tests share one Redis server, so each test scopes its keys
/// under a fresh name.
pub fn unique_cache_name(prefix: &str) -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}-{}-{}-{}",
        prefix,
        std::process::id(),
        chrono::Utc::now().timestamp_millis(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

// ============================================================================
// FIXTURE TYPES
// ============================================================================

/// A small structured record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub tags: Vec<String>,
    pub score: f64,
    pub active: bool,
    pub manager: Option<u64>,
}

/// A second record whose fields overlap `Profile`, for type-mismatch tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cache inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a valid cache name.
    pub fn arb_cache_name() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_.-]{1,32}"
    }

    /// Generate a non-empty logical key. May contain the separator.
    pub fn arb_key() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z0-9]{1,16}",
            "[a-z0-9:/]{1,24}",
            "\\PC{1,16}",
        ]
    }

    /// Generate a `Profile`.
    pub fn arb_profile() -> impl Strategy<Value = Profile> {
        (
            any::<u64>(),
            "\\PC{0,24}",
            prop::collection::vec("[a-z]{1,8}", 0..5),
            -1.0e9f64..1.0e9f64,
            any::<bool>(),
            proptest::option::of(any::<u64>()),
        )
            .prop_map(|(id, name, tags, score, active, manager)| Profile {
                id,
                name,
                tags,
                score,
                active,
                manager,
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common scenarios.

    use super::*;

    pub fn alice() -> Profile {
        Profile {
            id: 1,
            name: "Alice".to_string(),
            tags: vec!["admin".to_string(), "ops".to_string()],
            score: 97.5,
            active: true,
            manager: None,
        }
    }

    pub fn bob() -> Profile {
        Profile {
            id: 2,
            name: "Bob".to_string(),
            tags: vec![],
            score: -3.25,
            active: false,
            manager: Some(1),
        }
    }

    pub fn account() -> Account {
        Account {
            id: 1,
            name: "Alice".to_string(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over cache results.

    use super::*;

    /// Assert that a result is a store-unavailable error.
    #[track_caller]
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &CachetResult<T>) {
        match result {
            Err(CachetError::Store(StoreError::Unavailable { .. })) => {}
            other => panic!("Expected Unavailable store error, got: {:?}", other),
        }
    }

    /// Assert that a result is a serialization error.
    #[track_caller]
    pub fn assert_serialization_error<T: std::fmt::Debug>(result: &CachetResult<T>) {
        match result {
            Err(CachetError::Codec(CodecError::Serialization { .. })) => {}
            other => panic!("Expected Serialization error, got: {:?}", other),
        }
    }

    /// Assert that a result is a deserialization error, including a type
    /// mismatch.
    #[track_caller]
    pub fn assert_deserialization_error<T: std::fmt::Debug>(result: &CachetResult<T>) {
        match result {
            Err(e) if e.is_deserialization() => {}
            other => panic!("Expected Deserialization error, got: {:?}", other),
        }
    }

    /// Assert that a result is a `Config` error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CachetResult<T>) {
        match result {
            Err(CachetError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_cache_names_differ() {
        assert_ne!(unique_cache_name("t"), unique_cache_name("t"));
    }

    #[test]
    fn test_fixtures_distinct() {
        assert_ne!(fixtures::alice(), fixtures::bob());
    }

    #[test]
    fn test_init_test_tracing_is_idempotent() {
        init_test_tracing();
        init_test_tracing();
    }
}
