//! Configuration types

use crate::{CachetError, CachetResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-cache configuration.
///
/// Only the name is required. Expiry is opt-in: without `default_ttl`
/// entries live until evicted or until the store drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace for every key written through the cache.
    pub name: String,
    /// Expiry applied by `put` when set.
    pub default_ttl: Option<Duration>,
}

impl CacheConfig {
    /// Create a config with the given name and no expiry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_ttl: None,
        }
    }

    /// Set the default TTL applied by `put`.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Create from environment variables.
    ///
    /// Environment variables:
    /// - `CACHET_CACHE_NAME`: cache name (required)
    /// - `CACHET_DEFAULT_TTL_SECS`: default TTL in seconds (optional)
    pub fn from_env() -> CachetResult<Self> {
        let name = std::env::var("CACHET_CACHE_NAME").map_err(|_| {
            CachetError::Config(ConfigError::MissingRequired {
                field: "CACHET_CACHE_NAME".to_string(),
            })
        })?;

        let default_ttl = match std::env::var("CACHET_DEFAULT_TTL_SECS") {
            Ok(raw) => Some(Duration::from_secs(parse_env_u64(
                "CACHET_DEFAULT_TTL_SECS",
                &raw,
            )?)),
            Err(_) => None,
        };

        let config = Self { name, default_ttl };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - name is not empty
    /// - default_ttl, when set, is at least one millisecond
    pub fn validate(&self) -> CachetResult<()> {
        if self.name.is_empty() {
            return Err(CachetError::Config(ConfigError::MissingRequired {
                field: "name".to_string(),
            }));
        }

        if let Some(ttl) = self.default_ttl {
            if ttl.as_millis() == 0 {
                return Err(CachetError::Config(ConfigError::InvalidValue {
                    field: "default_ttl".to_string(),
                    value: format!("{:?}", ttl),
                    reason: "default_ttl must be at least 1ms".to_string(),
                }));
            }
        }

        Ok(())
    }
}

/// Connection settings for a Redis-compatible store.
///
/// The cache never reads this itself; it is consumed by whoever opens the
/// connection that is later injected into the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Connection URL (`redis://`, `rediss://` or `unix://`).
    pub url: String,
    /// Time allowed for establishing the connection.
    pub connect_timeout: Duration,
    /// Time allowed for each command response.
    pub response_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Create a config for the given URL with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CACHET_REDIS_URL`: connection URL (default: redis://127.0.0.1:6379)
    /// - `CACHET_REDIS_CONNECT_TIMEOUT_MS`: connect timeout (default: 5000)
    /// - `CACHET_REDIS_RESPONSE_TIMEOUT_MS`: response timeout (default: 2000)
    pub fn from_env() -> CachetResult<Self> {
        let defaults = Self::default();

        let url = std::env::var("CACHET_REDIS_URL").unwrap_or(defaults.url);
        let connect_timeout = match std::env::var("CACHET_REDIS_CONNECT_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(parse_env_u64(
                "CACHET_REDIS_CONNECT_TIMEOUT_MS",
                &raw,
            )?),
            Err(_) => defaults.connect_timeout,
        };
        let response_timeout = match std::env::var("CACHET_REDIS_RESPONSE_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(parse_env_u64(
                "CACHET_REDIS_RESPONSE_TIMEOUT_MS",
                &raw,
            )?),
            Err(_) => defaults.response_timeout,
        };

        let config = Self {
            url,
            connect_timeout,
            response_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - url uses a supported scheme
    /// - both timeouts are positive
    pub fn validate(&self) -> CachetResult<()> {
        const SCHEMES: [&str; 3] = ["redis://", "rediss://", "unix://"];
        if !SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(CachetError::Config(ConfigError::InvalidValue {
                field: "url".to_string(),
                value: self.url.clone(),
                reason: "url must start with redis://, rediss:// or unix://".to_string(),
            }));
        }

        if self.connect_timeout.is_zero() {
            return Err(CachetError::Config(ConfigError::InvalidValue {
                field: "connect_timeout".to_string(),
                value: format!("{:?}", self.connect_timeout),
                reason: "connect_timeout must be positive".to_string(),
            }));
        }

        if self.response_timeout.is_zero() {
            return Err(CachetError::Config(ConfigError::InvalidValue {
                field: "response_timeout".to_string(),
                value: format!("{:?}", self.response_timeout),
                reason: "response_timeout must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

fn parse_env_u64(field: &str, raw: &str) -> CachetResult<u64> {
    raw.trim().parse().map_err(|_| {
        CachetError::Config(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "expected a non-negative integer".to_string(),
        })
    })
}
