//! LMDB-backed key-value store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a disk-backed,
//! memory-mapped store. Useful as a cache that survives process restarts on
//! a single host.
//!
//! # Value Format
//!
//! LMDB has no native expiry, so each value is stored as
//! `[expires_at: 8 bytes LE unix millis, 0 = never][payload]`. Expired
//! entries read as absent; they are removed when overwritten, deleted or
//! cleared.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and `exists`
//! - Write transactions for `set`, `delete` and `delete_prefix`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use cachet_core::{CachetError, StoreError, StoreResult};
use chrono::Utc;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::store::KeyValueStore;

const BACKEND: &str = "lmdb";
const HEADER_LEN: usize = 8;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbStoreError> for StoreError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Transaction(reason) => StoreError::command(BACKEND, "txn", reason),
            other => StoreError::unavailable(BACKEND, other),
        }
    }
}

impl From<LmdbStoreError> for CachetError {
    fn from(e: LmdbStoreError) -> Self {
        CachetError::Store(e.into())
    }
}

fn txn_error(e: heed::Error) -> StoreError {
    LmdbStoreError::Transaction(e.to_string()).into()
}

/// LMDB-backed store.
///
/// # Example
///
/// ```ignore
/// use cachet_storage::{Cache, LmdbStore, StoreBackedCache};
///
/// let store = LmdbStore::open("/var/cache/app", 100)?;
/// let cache = StoreBackedCache::new(store, "profiles")?;
/// cache.put("42", &profile).await?;
/// ```
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open (or create) an LMDB store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }
}

fn encode_value(value: &[u8], ttl: Option<Duration>) -> Vec<u8> {
    let expires_at = ttl
        .map(|ttl| {
            let millis = ttl.as_millis().min(i64::MAX as u128) as i64;
            Utc::now().timestamp_millis().saturating_add(millis)
        })
        .unwrap_or(0);

    let mut bytes = Vec::with_capacity(HEADER_LEN + value.len());
    bytes.extend_from_slice(&expires_at.to_le_bytes());
    bytes.extend_from_slice(value);
    bytes
}

/// Payload of a stored record if it is live.
fn live_payload(bytes: &[u8], now_millis: i64) -> Option<&[u8]> {
    if bytes.len() < HEADER_LEN {
        return None;
    }
    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&bytes[..HEADER_LEN]);
    let expires_at = i64::from_le_bytes(header);
    if expires_at != 0 && expires_at <= now_millis {
        return None;
    }
    Some(&bytes[HEADER_LEN..])
}

#[async_trait]
impl KeyValueStore for LmdbStore {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let now = Utc::now().timestamp_millis();
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let stored = self.db.get(&rtxn, key).map_err(txn_error)?;
        Ok(stored.and_then(|bytes| live_payload(bytes, now)).map(<[u8]>::to_vec))
    }

    async fn set(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StoreResult<()> {
        let full_bytes = encode_value(value, ttl);

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db.put(&mut wtxn, key, &full_bytes).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)
    }

    async fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        let now = Utc::now().timestamp_millis();
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;

        let was_live = self
            .db
            .get(&wtxn, key)
            .map_err(txn_error)?
            .is_some_and(|bytes| live_payload(bytes, now).is_some());
        self.db.delete(&mut wtxn, key).map_err(txn_error)?;

        wtxn.commit().map_err(txn_error)?;
        Ok(was_live)
    }

    async fn exists(&self, key: &[u8]) -> StoreResult<bool> {
        let now = Utc::now().timestamp_millis();
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        Ok(self
            .db
            .get(&rtxn, key)
            .map_err(txn_error)?
            .is_some_and(|bytes| live_payload(bytes, now).is_some()))
    }

    async fn delete_prefix(&self, prefix: &[u8]) -> StoreResult<u64> {
        let now = Utc::now().timestamp_millis();

        // Collect matches under a read txn, then delete them in one write txn.
        let matches: Vec<(Vec<u8>, bool)> = {
            let rtxn = self.env.read_txn().map_err(txn_error)?;
            let mut matches = Vec::new();
            for result in self.db.iter(&rtxn).map_err(txn_error)? {
                let (key, value) = result.map_err(txn_error)?;
                if key.starts_with(prefix) {
                    matches.push((key.to_vec(), live_payload(value, now).is_some()));
                }
            }
            matches
        };

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let mut removed = 0u64;
        for (key, live) in &matches {
            if self.db.delete(&mut wtxn, key).map_err(txn_error)? && *live {
                removed += 1;
            }
        }
        wtxn.commit().map_err(txn_error)?;

        Ok(removed)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.env.read_txn().map(|_| ()).map_err(txn_error)
    }
}
