//! Key transformers.

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// A reversible key rewrite.
///
/// Law: `reverse_transform_key(transform_key(k)?)? == k` for every key the
/// transformer accepts, unless the transformer documents its reverse as
/// unsupported.
pub trait KeyTransformer: Send + Sync {
    /// Rewrite a caller key into the key handed to the child store.
    fn transform_key(&self, key: &str) -> StoreResult<String>;

    /// Recover the caller key from a child key.
    ///
    /// Returns [`StoreError::KeyRejected`] for a child key this transformer
    /// could not have produced.
    fn reverse_transform_key(&self, key: &str) -> StoreResult<String>;
}

/// The no-op key transformer.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityKeyTransformer;

impl KeyTransformer for IdentityKeyTransformer {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(key.to_string())
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(key.to_string())
    }
}

// ---------------------------------------------------------------------------
// Prefix
// ---------------------------------------------------------------------------

/// Prepends a literal prefix.
#[derive(Clone, Debug)]
pub struct PrefixKeyTransformer {
    prefix: String,
}

impl PrefixKeyTransformer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl KeyTransformer for PrefixKeyTransformer {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(format!("{}{key}", self.prefix))
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        key.strip_prefix(self.prefix.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::key_rejected(key, format!("missing prefix {:?}", self.prefix))
            })
    }
}

// ---------------------------------------------------------------------------
// Hash prefix
// ---------------------------------------------------------------------------

/// Digest used by [`HashPrefixKeyTransformer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    /// Lower-case hex digest of `data`.
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }

    /// Parse `"sha256"` or `"blake3"`.
    pub fn from_name(name: &str) -> StoreResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(StoreError::Configuration(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}

/// Prepends `hex(hash(key))[..hash_length] + separator`.
///
/// Spreads keys across prefixes (useful for object stores that partition on
/// key prefix). The reverse strips `hash_length + separator.len()` characters
/// without recomputing the hash unless [`verifying`](Self::verifying) is set,
/// in which case a child key whose prefix does not match its remainder is
/// rejected.
#[derive(Clone, Debug)]
pub struct HashPrefixKeyTransformer {
    hash_length: usize,
    separator: String,
    algorithm: HashAlgorithm,
    verify: bool,
}

/// Hex digest length of both supported algorithms.
const MAX_HASH_LENGTH: usize = 64;

impl HashPrefixKeyTransformer {
    pub fn new(hash_length: usize, separator: impl Into<String>) -> StoreResult<Self> {
        if hash_length == 0 || hash_length > MAX_HASH_LENGTH {
            return Err(StoreError::Configuration(format!(
                "hash_length must be 1-{MAX_HASH_LENGTH}, got {hash_length}"
            )));
        }
        Ok(Self {
            hash_length,
            separator: separator.into(),
            algorithm: HashAlgorithm::default(),
            verify: false,
        })
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Re-derive and compare the hash prefix when reversing.
    pub fn verifying(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn hash_length(&self) -> usize {
        self.hash_length
    }

    fn prefix_for(&self, key: &str) -> String {
        let mut digest = self.algorithm.hex_digest(key.as_bytes());
        digest.truncate(self.hash_length);
        digest
    }
}

impl Default for HashPrefixKeyTransformer {
    fn default() -> Self {
        Self {
            hash_length: 8,
            separator: "/".into(),
            algorithm: HashAlgorithm::default(),
            verify: false,
        }
    }
}

impl KeyTransformer for HashPrefixKeyTransformer {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(format!("{}{}{key}", self.prefix_for(key), self.separator))
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        let skip = self.hash_length + self.separator.chars().count();
        if key.chars().count() < skip {
            return Err(StoreError::key_rejected(key, "shorter than the hash prefix"));
        }
        let split_at = key.char_indices().nth(skip).map_or(key.len(), |(i, _)| i);
        let original = &key[split_at..];
        if self.verify {
            let expected = format!("{}{}", self.prefix_for(original), self.separator);
            if key[..split_at] != expected {
                return Err(StoreError::key_rejected(key, "hash prefix does not match key"));
            }
        }
        Ok(original.to_string())
    }
}

// ---------------------------------------------------------------------------
// URL encoding
// ---------------------------------------------------------------------------

/// Percent-encodes every `/`-separated segment, keeping `/` as structure.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlEncodingKeyTransformer;

impl KeyTransformer for UrlEncodingKeyTransformer {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/"))
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        key.split('/')
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .map_err(|e| StoreError::key_rejected(key, e.to_string()))
            })
            .collect::<StoreResult<Vec<_>>>()
            .map(|segments| segments.join("/"))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Decides whether a key is acceptable.
pub trait KeyValidator: Send + Sync {
    /// Return `Ok(())` to accept, [`StoreError::KeyRejected`] to refuse.
    fn validate(&self, key: &str) -> StoreResult<()>;
}

impl<F> KeyValidator for F
where
    F: Fn(&str) -> StoreResult<()> + Send + Sync,
{
    fn validate(&self, key: &str) -> StoreResult<()> {
        self(key)
    }
}

/// Accepts keys matched by a regex at their start.
#[derive(Clone, Debug)]
pub struct RegexValidator {
    pattern: Regex,
}

impl RegexValidator {
    pub fn new(pattern: &str) -> StoreResult<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| StoreError::Configuration(format!("invalid key pattern: {e}")))?;
        Ok(Self { pattern })
    }
}

impl KeyValidator for RegexValidator {
    fn validate(&self, key: &str) -> StoreResult<()> {
        // The leftmost match starts at 0 whenever any match does.
        match self.pattern.find(key) {
            Some(m) if m.start() == 0 => Ok(()),
            _ => Err(StoreError::key_rejected(
                key,
                format!("does not match pattern {}", self.pattern.as_str()),
            )),
        }
    }
}

/// Accepts absolute `http`/`https` URLs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpUrlValidator;

impl KeyValidator for HttpUrlValidator {
    fn validate(&self, key: &str) -> StoreResult<()> {
        match url::Url::parse(key) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(StoreError::key_rejected(key, "not a valid http/s url")),
        }
    }
}

/// Runs a validator on the forward path; the reverse path is the identity.
#[derive(Clone, Debug)]
pub struct ValidatingKeyTransformer<V> {
    validator: V,
}

impl<V: KeyValidator> ValidatingKeyTransformer<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }
}

impl<V: KeyValidator> KeyTransformer for ValidatingKeyTransformer<V> {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        self.validator.validate(key)?;
        Ok(key.to_string())
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        Ok(key.to_string())
    }
}
