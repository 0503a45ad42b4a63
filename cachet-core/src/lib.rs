//! Cachet Core - Shared Types
//!
//! Error taxonomy, configuration and health reporting used by every other
//! Cachet crate. This crate has no I/O and no store-specific code.

pub mod config;
pub mod error;
pub mod health;

pub use config::{CacheConfig, RedisConfig};
pub use error::{
    CachetError, CachetResult, CodecError, ConfigError, KeyError, StoreError, StoreResult,
};
pub use health::{HealthCheck, HealthStatus};
