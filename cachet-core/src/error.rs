//! Error types for Cachet operations

use thiserror::Error;

/// Codec errors raised while converting values to and from stored bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Serialization failed for {type_name}: {reason}")]
    Serialization { type_name: String, reason: String },

    #[error("Deserialization failed for {type_name}: {reason}")]
    Deserialization { type_name: String, reason: String },

    #[error("Type mismatch: requested {requested}, stored {stored}")]
    TypeMismatch { requested: String, stored: String },
}

impl CodecError {
    /// True for errors raised while reading a stored value back.
    pub fn is_deserialization(&self) -> bool {
        matches!(
            self,
            Self::Deserialization { .. } | Self::TypeMismatch { .. }
        )
    }
}

/// Backing store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached: connection refused, reset, dropped or
    /// timed out.
    #[error("Store {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    /// The store was reachable but rejected the command.
    #[error("Store {backend} rejected command {command}: {reason}")]
    Command {
        backend: String,
        command: String,
        reason: String,
    },
}

impl StoreError {
    pub fn unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }

    pub fn command(
        backend: impl Into<String>,
        command: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::Command {
            backend: backend.into(),
            command: command.into(),
            reason: reason.to_string(),
        }
    }
}

/// Key and cache name validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("Cache name must not be empty")]
    EmptyName,

    #[error("Cache name is {len} bytes, limit is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("Cache name {name:?} contains invalid character {ch:?}")]
    InvalidNameChar { name: String, ch: char },

    #[error("Cache key must not be empty")]
    EmptyKey,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Cachet errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CachetError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CachetError {
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable { .. }))
    }

    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Codec(CodecError::Serialization { .. }))
    }

    pub fn is_deserialization(&self) -> bool {
        matches!(self, Self::Codec(e) if e.is_deserialization())
    }
}

/// Result type alias for Cachet operations.
pub type CachetResult<T> = Result<T, CachetError>;

/// Result type alias for raw store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// TESTS
// =============================================================================
