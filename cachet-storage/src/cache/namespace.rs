//! Cache-name namespacing for a shared key-value store.
//!
//! Every key a cache writes is prefixed with its validated name and a
//! separator byte. Cache names cannot contain the separator, so the first
//! separator in a physical key always marks the end of the namespace and two
//! caches with different names can never produce the same physical key.

use std::fmt;

use cachet_core::KeyError;

/// Separator byte between the cache name and the logical key.
pub const SEPARATOR: u8 = b':';

/// Longest accepted cache name, in bytes.
pub const MAX_CACHE_NAME_LEN: usize = 128;

/// A validated cache name.
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`. This keeps the separator
/// and glob metacharacters out of every namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheName(String);

impl CacheName {
    /// Validate and wrap a cache name.
    pub fn new(name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        if name.is_empty() {
            return Err(KeyError::EmptyName);
        }
        if name.len() > MAX_CACHE_NAME_LEN {
            return Err(KeyError::NameTooLong {
                len: name.len(),
                max: MAX_CACHE_NAME_LEN,
            });
        }
        if let Some(ch) = name.chars().find(|c| !is_name_char(*c)) {
            return Err(KeyError::InvalidNameChar { name, ch });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CacheName {
    type Error = KeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// A physical store key scoped to one cache name.
///
/// # Format
///
/// `<cache name> ':' <logical key>` as UTF-8 bytes. The logical key may
/// itself contain `:`; decoding splits at the first separator only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespacedKey {
    inner: NamespacedKeyInner,
}

/// Private inner struct - prevents construction without validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct NamespacedKeyInner {
    name: CacheName,
    key: String,
}

impl NamespacedKey {
    /// Scope a logical key to a cache name.
    ///
    /// Fails with [`KeyError::EmptyKey`] for an empty logical key.
    pub fn new(name: &CacheName, key: &str) -> Result<Self, KeyError> {
        if key.is_empty() {
            return Err(KeyError::EmptyKey);
        }
        Ok(Self {
            inner: NamespacedKeyInner {
                name: name.clone(),
                key: key.to_string(),
            },
        })
    }

    pub fn name(&self) -> &CacheName {
        &self.inner.name
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Encode to the physical store key.
    pub fn encode(&self) -> Vec<u8> {
        let name = self.inner.name.as_str().as_bytes();
        let key = self.inner.key.as_bytes();

        let mut bytes = Vec::with_capacity(name.len() + 1 + key.len());
        bytes.extend_from_slice(name);
        bytes.push(SEPARATOR);
        bytes.extend_from_slice(key);
        bytes
    }

    /// Decode a physical store key.
    ///
    /// Returns `None` if:
    /// - The bytes are not UTF-8
    /// - There is no separator
    /// - The name part is not a valid cache name
    /// - The key part is empty
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        let (name, key) = text.split_once(SEPARATOR as char)?;
        let name = CacheName::new(name).ok()?;
        Self::new(&name, key).ok()
    }

    /// Prefix shared by every physical key of a cache.
    pub fn namespace_prefix(name: &CacheName) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(name.as_str().len() + 1);
        prefix.extend_from_slice(name.as_str().as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> CacheName {
        CacheName::new(s).expect("valid cache name")
    }

    #[test]
    fn test_cache_name_accepts_common_names() {
        for s in ["test", "user-sessions", "v2.profiles", "a_b", "X"] {
            assert_eq!(name(s).as_str(), s);
        }
    }

    #[test]
    fn test_cache_name_rejects_empty() {
        assert_eq!(CacheName::new(""), Err(KeyError::EmptyName));
    }

    #[test]
    fn test_cache_name_rejects_separator_and_globs() {
        for (s, ch) in [("a:b", ':'), ("a*", '*'), ("a?", '?'), ("[a]", '['), ("a b", ' ')] {
            assert_eq!(
                CacheName::new(s),
                Err(KeyError::InvalidNameChar {
                    name: s.to_string(),
                    ch,
                })
            );
        }
    }

    #[test]
    fn test_cache_name_rejects_too_long() {
        let long = "n".repeat(MAX_CACHE_NAME_LEN + 1);
        assert!(matches!(
            CacheName::new(long),
            Err(KeyError::NameTooLong { len: 129, max: 128 })
        ));
        assert!(CacheName::new("n".repeat(MAX_CACHE_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_encode_format() {
        let key = NamespacedKey::new(&name("test"), "foo").expect("valid key");
        assert_eq!(key.encode(), b"test:foo".to_vec());
    }

    #[test]
    fn test_empty_key_rejected() {
        assert_eq!(
            NamespacedKey::new(&name("test"), ""),
            Err(KeyError::EmptyKey)
        );
    }

    #[test]
    fn test_key_may_contain_separator() {
        let key = NamespacedKey::new(&name("users"), "42:profile").expect("valid key");
        let decoded = NamespacedKey::decode(&key.encode()).expect("decode should succeed");
        assert_eq!(decoded.name().as_str(), "users");
        assert_eq!(decoded.key(), "42:profile");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(NamespacedKey::decode(b"no-separator").is_none());
        assert!(NamespacedKey::decode(b":foo").is_none());
        assert!(NamespacedKey::decode(b"test:").is_none());
        assert!(NamespacedKey::decode(&[0xFF, b':', b'a']).is_none());
    }

    #[test]
    fn test_different_names_different_keys() {
        let a = NamespacedKey::new(&name("a"), "k").expect("valid key");
        let b = NamespacedKey::new(&name("b"), "k").expect("valid key");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_prefix_name_does_not_capture_longer_name() {
        // "ab:" must not be a prefix of anything in "abc"
        let prefix = NamespacedKey::namespace_prefix(&name("ab"));
        let other = NamespacedKey::new(&name("abc"), "k").expect("valid key");
        assert!(!other.encode().starts_with(&prefix));
    }

    #[test]
    fn test_name_prefixed_key_does_not_cross_namespaces() {
        // Cache "a" with key "b:c" vs cache "a:b" is impossible since ':' is
        // not a name char, so the physical keys stay distinct.
        assert!(CacheName::new("a:b").is_err());
        let key = NamespacedKey::new(&name("a"), "b:c").expect("valid key");
        assert_eq!(key.encode(), b"a:b:c".to_vec());
        let decoded = NamespacedKey::decode(&key.encode()).expect("decode should succeed");
        assert_eq!(decoded.name().as_str(), "a");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn name_strategy() -> impl Strategy<Value = CacheName> {
        "[A-Za-z0-9_.-]{1,32}".prop_map(|s| CacheName::new(s).expect("strategy yields valid names"))
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        ".{1,48}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Property: the physical key is deterministic.
        #[test]
        fn prop_encode_deterministic(name in name_strategy(), key in key_strategy()) {
            let a = NamespacedKey::new(&name, &key).expect("valid key");
            let b = NamespacedKey::new(&name, &key).expect("valid key");
            prop_assert_eq!(a.encode(), b.encode());
        }

        /// Property: decoding recovers the name and key.
        #[test]
        fn prop_encode_decode_roundtrip(name in name_strategy(), key in key_strategy()) {
            let original = NamespacedKey::new(&name, &key).expect("valid key");
            let decoded = NamespacedKey::decode(&original.encode());
            prop_assert_eq!(Some(original), decoded);
        }

        /// Property: encoding is injective across names and keys.
        #[test]
        fn prop_encoding_is_injective(
            name1 in name_strategy(),
            name2 in name_strategy(),
            key1 in key_strategy(),
            key2 in key_strategy(),
        ) {
            let k1 = NamespacedKey::new(&name1, &key1).expect("valid key");
            let k2 = NamespacedKey::new(&name2, &key2).expect("valid key");
            if k1 == k2 {
                prop_assert_eq!(k1.encode(), k2.encode());
            } else {
                prop_assert_ne!(k1.encode(), k2.encode(), "Different keys must have different encodings");
            }
        }

        /// Property: a namespace prefix matches exactly the keys of that name.
        #[test]
        fn prop_prefix_matches_only_own_namespace(
            name1 in name_strategy(),
            name2 in name_strategy(),
            key in key_strategy(),
        ) {
            let encoded = NamespacedKey::new(&name2, &key).expect("valid key").encode();
            let prefix = NamespacedKey::namespace_prefix(&name1);
            prop_assert_eq!(encoded.starts_with(&prefix), name1 == name2);
        }
    }
}
