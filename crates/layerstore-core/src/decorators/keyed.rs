use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyIter, ObjectStore};
use crate::transform::{
    FilesystemSafeKeyTransformer, HashPrefixKeyTransformer, HttpUrlValidator, KeyTransformer,
    KeyValidator, PrefixKeyTransformer, RegexValidator, UrlEncodingKeyTransformer,
    ValidatingKeyTransformer,
};

/// Rewrites keys with a [`KeyTransformer`] before they reach the child.
///
/// Every keyed operation transforms first, so a rejecting transformer (see
/// [`KeyValidatingStore`]) fails before the child is touched. Listing reverses
/// each child key; keys the transformer rejects on reverse belong to some
/// other namespace and are skipped.
#[derive(Debug)]
pub struct KeyTransformingStore<S, K> {
    inner: S,
    transformer: K,
}

pub type PrefixStore<S> = KeyTransformingStore<S, PrefixKeyTransformer>;
pub type HashPrefixStore<S> = KeyTransformingStore<S, HashPrefixKeyTransformer>;
pub type UrlEncodingStore<S> = KeyTransformingStore<S, UrlEncodingKeyTransformer>;
pub type FilesystemSafeStore<S> = KeyTransformingStore<S, FilesystemSafeKeyTransformer>;
pub type KeyValidatingStore<S, V> = KeyTransformingStore<S, ValidatingKeyTransformer<V>>;
pub type RegexValidatingStore<S> = KeyValidatingStore<S, RegexValidator>;
pub type UrlValidatingStore<S> = KeyValidatingStore<S, HttpUrlValidator>;

impl<S, K> KeyTransformingStore<S, K> {
    pub fn new(inner: S, transformer: K) -> Self {
        Self { inner, transformer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn transformer(&self) -> &K {
        &self.transformer
    }
}

impl<S> PrefixStore<S> {
    pub fn with_prefix(inner: S, prefix: impl Into<String>) -> Self {
        Self::new(inner, PrefixKeyTransformer::new(prefix))
    }
}

impl<S> HashPrefixStore<S> {
    /// Default hash prefix: 8 hex characters of SHA-256 and a `/`.
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, HashPrefixKeyTransformer::default())
    }
}

impl<S> UrlEncodingStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, UrlEncodingKeyTransformer)
    }
}

impl<S> FilesystemSafeStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, FilesystemSafeKeyTransformer)
    }
}

impl<S, V: KeyValidator> KeyValidatingStore<S, V> {
    pub fn with_validator(inner: S, validator: V) -> Self {
        Self::new(inner, ValidatingKeyTransformer::new(validator))
    }
}

impl<S> RegexValidatingStore<S> {
    pub fn with_pattern(inner: S, pattern: &str) -> StoreResult<Self> {
        Ok(Self::with_validator(inner, RegexValidator::new(pattern)?))
    }
}

impl<S> UrlValidatingStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::with_validator(inner, HttpUrlValidator)
    }
}

/// Reverse-transform child keys, dropping those outside this namespace.
pub(crate) fn reverse_keys<'a, K: KeyTransformer>(
    transformer: &'a K,
    keys: KeyIter<'a>,
) -> KeyIter<'a> {
    Box::new(keys.filter_map(move |item| match item {
        Err(err) => Some(Err(err)),
        Ok(key) => match transformer.reverse_transform_key(&key) {
            Ok(original) => Some(Ok(original)),
            Err(StoreError::KeyRejected { .. }) => None,
            Err(err) => Some(Err(err)),
        },
    }))
}

impl<S, K> ObjectStore for KeyTransformingStore<S, K>
where
    S: ObjectStore,
    K: KeyTransformer,
{
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        let key = self.transformer.transform_key(key)?;
        self.inner.get(&key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        let key = self.transformer.transform_key(key)?;
        self.inner.put(&key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let key = self.transformer.transform_key(key)?;
        self.inner.exists(&key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.transformer.transform_key(key)?;
        self.inner.delete(&key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Ok(reverse_keys(&self.transformer, self.inner.keys()?))
    }

    fn open(&self) -> StoreResult<()> {
        self.inner.open()
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::DictStore;
    use crate::testing::{Journal, RecordingStore};

    fn collect(store: &impl ObjectStore) -> Vec<String> {
        store.keys().unwrap().collect::<StoreResult<_>>().unwrap()
    }

    #[test]
    fn prefix_store_namespaces_keys() {
        let store = PrefixStore::with_prefix(DictStore::new(), "pfx/");
        store.put("a/b/c", b"v".to_vec()).unwrap();
        assert!(store.inner().exists("pfx/a/b/c").unwrap());
        assert_eq!(store.get("a/b/c").unwrap(), b"v");
        assert_eq!(collect(&store), vec!["a/b/c"]);
    }

    #[test]
    fn prefix_store_skips_foreign_keys_when_listing() {
        let shared = DictStore::with_objects([("other/x", b"1".to_vec())]);
        let store = PrefixStore::with_prefix(shared, "mine/");
        store.put("y", b"2".to_vec()).unwrap();
        assert_eq!(collect(&store), vec!["y"]);
        assert_eq!(collect(store.inner()), vec!["mine/y", "other/x"]);
    }

    #[test]
    fn hash_prefix_store_lists_original_keys() {
        let store = HashPrefixStore::wrap(DictStore::new());
        store.put("one", b"1".to_vec()).unwrap();
        store.put("two", b"2".to_vec()).unwrap();
        let mut keys = collect(&store);
        keys.sort();
        assert_eq!(keys, vec!["one", "two"]);
        // 8 hex characters, a separator, then the three-letter key.
        assert!(collect(store.inner()).iter().all(|k| k.len() == 12));
    }

    #[test]
    fn url_encoding_store_round_trip() {
        let store = UrlEncodingStore::wrap(DictStore::new());
        store.put("a b/c?d", b"v".to_vec()).unwrap();
        assert!(store.inner().exists("a%20b/c%3Fd").unwrap());
        assert_eq!(collect(&store), vec!["a b/c?d"]);
    }

    #[test]
    fn rejected_key_never_reaches_child() {
        let journal = Journal::new();
        let store = RegexValidatingStore::with_pattern(
            RecordingStore::new(DictStore::new(), journal.clone()),
            r"^[a-z]+$",
        )
        .unwrap();
        store.put("good", b"v".to_vec()).unwrap();
        let err = store.put("Bad Key", b"v".to_vec()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyRejected);
        assert_eq!(store.get("Bad Key").unwrap_err().kind(), ErrorKind::KeyRejected);
        assert_eq!(journal.entries(), vec!["put good"]);
    }

    #[test]
    fn url_validating_store() {
        let store = UrlValidatingStore::wrap(DictStore::new());
        store.put("https://example.com/x", b"v".to_vec()).unwrap();
        assert!(store.put("not a url", b"v".to_vec()).is_err());
        assert_eq!(collect(&store), vec!["https://example.com/x"]);
    }

    #[test]
    fn closure_validator() {
        let store = KeyValidatingStore::with_validator(DictStore::new(), |key: &str| {
            if key.len() <= 4 {
                Ok(())
            } else {
                Err(StoreError::key_rejected(key, "too long"))
            }
        });
        store.put("abcd", b"v".to_vec()).unwrap();
        assert!(store.put("abcde", b"v".to_vec()).is_err());
    }

    #[test]
    fn filesystem_safe_store_encodes_names() {
        let store = FilesystemSafeStore::wrap(DictStore::new());
        store.put("../escape", b"v".to_vec()).unwrap();
        let raw = collect(store.inner());
        assert_eq!(raw.len(), 1);
        assert!(!raw[0].contains('/') && !raw[0].contains('.'));
        assert_eq!(collect(&store), vec!["../escape"]);
    }

    #[test]
    fn keys_with_prefix_applies_to_caller_keys() {
        let store = PrefixStore::with_prefix(DictStore::new(), "ns/");
        store.put("x/1", Vec::new()).unwrap();
        store.put("y/2", Vec::new()).unwrap();
        let keys: Vec<String> = store
            .keys_with_prefix("x/")
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        assert_eq!(keys, vec!["x/1"]);
    }
}
