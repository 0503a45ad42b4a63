//! Redis-backed key-value store.
//!
//! Wraps an already-established async Redis connection. Any connection type
//! implementing [`redis::aio::ConnectionLike`] + `Clone` works; the usual
//! choices are [`MultiplexedConnection`] and
//! [`ConnectionManager`](redis::aio::ConnectionManager).
//!
//! # Concurrency
//!
//! Each command runs on a clone of the connection handle. Clones of a
//! multiplexed connection share one socket and pipeline requests, so a
//! single store can be used from many tasks at once.
//!
//! # Errors
//!
//! I/O failures, timeouts and refused or dropped connections become
//! [`StoreError::Unavailable`]. Errors the server reports for a command
//! (`WRONGTYPE`, `OOM`, ...) become [`StoreError::Command`].

use std::time::Duration;

use async_trait::async_trait;
use cachet_core::{CachetError, CachetResult, ConfigError, RedisConfig, StoreError, StoreResult};
use redis::aio::{ConnectionLike, MultiplexedConnection};
use redis::{ErrorKind, RedisError};

use super::store::KeyValueStore;

const BACKEND: &str = "redis";

/// Keys fetched per `SCAN` round trip when clearing a prefix.
const DEFAULT_SCAN_COUNT: usize = 500;

/// Store over a Redis connection.
#[derive(Clone)]
pub struct RedisStore<C = MultiplexedConnection> {
    conn: C,
    scan_count: usize,
}

impl<C> RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    /// Wrap an established connection. The store does not own the
    /// connection's lifecycle; dropping the store only drops this handle.
    pub fn new(conn: C) -> Self {
        Self {
            conn,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }

    /// Set the `COUNT` hint used by `SCAN` in [`KeyValueStore::delete_prefix`].
    pub fn with_scan_count(mut self, count: usize) -> Self {
        self.scan_count = count.max(1);
        self
    }

    fn conn(&self) -> C {
        self.conn.clone()
    }
}

impl RedisStore<MultiplexedConnection> {
    /// Open a multiplexed connection using the configured timeouts.
    ///
    /// Provided for callers that do not manage connections themselves. The
    /// resulting store is then injected into a cache like any other.
    pub async fn connect(config: &RedisConfig) -> CachetResult<Self> {
        config.validate()?;

        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CachetError::Config(ConfigError::InvalidValue {
                field: "url".to_string(),
                value: config.url.clone(),
                reason: e.to_string(),
            })
        })?;

        let conn = client
            .get_multiplexed_async_connection_with_timeouts(
                config.response_timeout,
                config.connect_timeout,
            )
            .await
            .map_err(|e| map_redis_error("CONNECT", e))?;

        tracing::debug!(url = %redact_url(&config.url), "Connected to redis");
        Ok(Self::new(conn))
    }
}

/// Whether the error means the server could not be reached.
fn is_connectivity_error(err: &RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
        || err.kind() == ErrorKind::IoError
}

fn map_redis_error(command: &str, err: RedisError) -> StoreError {
    if is_connectivity_error(&err) {
        tracing::warn!(backend = BACKEND, command, error = %err, "Redis unavailable");
        StoreError::unavailable(BACKEND, err)
    } else {
        StoreError::command(BACKEND, command, err)
    }
}

/// Turn a byte prefix into a `SCAN MATCH` pattern, escaping glob syntax.
fn prefix_pattern(prefix: &[u8]) -> Vec<u8> {
    let mut pattern = Vec::with_capacity(prefix.len() + 1);
    for &b in prefix {
        if matches!(b, b'*' | b'?' | b'[' | b']' | b'\\') {
            pattern.push(b'\\');
        }
        pattern.push(b);
    }
    pattern.push(b'*');
    pattern
}

/// Strip credentials before logging a URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    ttl.as_millis().clamp(1, u64::MAX as u128) as u64
}

#[async_trait]
impl<C> KeyValueStore for RedisStore<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.conn();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("GET", e))
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let mut conn = self.conn();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("SET", e))?;
        Ok(())
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        let mut conn = self.conn();
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("DEL", e))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        let mut conn = self.conn();
        redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("EXISTS", e))
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> StoreResult<u64> {
        let mut conn = self.conn();
        let pattern = prefix_pattern(prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0u64;

        loop {
            let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern.as_slice())
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error("SCAN", e))?;

            if !keys.is_empty() {
                let mut del = redis::cmd("DEL");
                for key in &keys {
                    del.arg(key.as_slice());
                }
                let count: u64 = del
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| map_redis_error("DEL", e))?;
                removed += count;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("PING", e))?;
        Ok(())
    }
}
