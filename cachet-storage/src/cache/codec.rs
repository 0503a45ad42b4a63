//! Value codecs.
//!
//! A codec turns a typed value into the bytes handed to the store and back.
//! The store itself is type-erased, so the default [`JsonCodec`] writes a
//! small envelope that records the Rust type the value was written as. A
//! read for a different type fails with [`CodecError::TypeMismatch`] instead
//! of coercing whatever JSON happens to fit.
//!
//! # Envelope
//!
//! ```text
//! {"type":"alloc::string::String","cached_at":1718000000000,"value":"FOO"}
//! ```
//!
//! # Fidelity
//!
//! Anything `serde_json` round-trips is supported. Non-finite floats are
//! written as `null` by `serde_json` and do not survive a round trip. Maps
//! with non-string keys fail at encode time.

use std::any::type_name;
use std::time::Duration;

use cachet_core::CodecError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Values that can be stored in a cache.
///
/// Blanket-implemented for every owned, thread-safe serde type.
pub trait Cacheable: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Tag written into the envelope for `T`.
pub fn type_tag<T: Cacheable>() -> &'static str {
    type_name::<T>()
}

/// A decoded value together with the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
        Self { value, cached_at }
    }

    /// Time since the entry was written. Zero if the clock moved backwards.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.cached_at).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Encode/decode pair used by a cache.
pub trait Codec: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Encode a value written at `cached_at`.
    fn encode<T: Cacheable>(&self, value: &T, cached_at: DateTime<Utc>)
        -> Result<Vec<u8>, CodecError>;

    /// Decode stored bytes as `T`.
    fn decode<T: Cacheable>(&self, bytes: &[u8]) -> Result<CacheEntry<T>, CodecError>;
}

/// JSON envelope codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    #[serde(rename = "type")]
    type_tag: &'a str,
    cached_at: i64,
    value: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeIn<'a> {
    #[serde(rename = "type")]
    type_tag: String,
    cached_at: i64,
    #[serde(borrow)]
    value: &'a RawValue,
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Cacheable>(
        &self,
        value: &T,
        cached_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, CodecError> {
        let envelope = EnvelopeOut {
            type_tag: type_tag::<T>(),
            cached_at: cached_at.timestamp_millis(),
            value,
        };
        serde_json::to_vec(&envelope).map_err(|e| CodecError::Serialization {
            type_name: type_tag::<T>().to_string(),
            reason: e.to_string(),
        })
    }

    fn decode<T: Cacheable>(&self, bytes: &[u8]) -> Result<CacheEntry<T>, CodecError> {
        let requested = type_tag::<T>();
        let deserialization = |reason: String| CodecError::Deserialization {
            type_name: requested.to_string(),
            reason,
        };

        let envelope: EnvelopeIn<'_> =
            serde_json::from_slice(bytes).map_err(|e| deserialization(e.to_string()))?;

        if envelope.type_tag != requested {
            return Err(CodecError::TypeMismatch {
                requested: requested.to_string(),
                stored: envelope.type_tag,
            });
        }

        let cached_at = DateTime::from_timestamp_millis(envelope.cached_at)
            .ok_or_else(|| deserialization(format!("invalid timestamp {}", envelope.cached_at)))?;

        let value: T = serde_json::from_str(envelope.value.get())
            .map_err(|e| deserialization(e.to_string()))?;

        Ok(CacheEntry::new(value, cached_at))
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: decode(encode(v)) == v for strings.
        #[test]
        fn prop_string_roundtrip(value in ".*") {
            let bytes = JsonCodec.encode(&value, Utc::now()).expect("encode");
            let entry = JsonCodec.decode::<String>(&bytes).expect("decode");
            prop_assert_eq!(entry.value, value);
        }

        /// Property: decode(encode(v)) == v for integer vectors.
        #[test]
        fn prop_vec_roundtrip(value in proptest::collection::vec(any::<i64>(), 0..32)) {
            let bytes = JsonCodec.encode(&value, Utc::now()).expect("encode");
            let entry = JsonCodec.decode::<Vec<i64>>(&bytes).expect("decode");
            prop_assert_eq!(entry.value, value);
        }

        /// Property: finite floats survive a round trip.
        #[test]
        fn prop_finite_float_roundtrip(value in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let bytes = JsonCodec.encode(&value, Utc::now()).expect("encode");
            let entry = JsonCodec.decode::<f64>(&bytes).expect("decode");
            prop_assert_eq!(entry.value, value);
        }
    }
}
