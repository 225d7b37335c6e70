use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{StoreError, StoreResult};
use crate::traits::{AsyncObjectStore, KeyIter, KeyStream, ObjectStore};

/// In-memory, HashMap-based byte store.
///
/// Intended for tests, caches and embedding. Objects live behind a `RwLock`
/// and are cloned on read. `keys()` yields a sorted snapshot, so mutating the
/// store while iterating is safe.
pub struct DictStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl DictStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Create a store pre-populated with `objects`.
    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            objects: RwLock::new(
                objects
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.objects.read()?.len())
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.objects.read()?.is_empty())
    }

    fn sorted_keys(&self) -> StoreResult<Vec<String>> {
        let map = self.objects.read()?;
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for DictStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for DictStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let map = self.objects.read()?;
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.objects.write()?.insert(key.to_string(), value);
        Ok(())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.read()?.contains_key(key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        match self.objects.write()?.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(key)),
        }
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Ok(Box::new(self.sorted_keys()?.into_iter().map(Ok)))
    }
}

impl std::fmt::Debug for DictStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.objects.read().map(|m| m.len()).unwrap_or_default();
        f.debug_struct("DictStore")
            .field("object_count", &count)
            .finish()
    }
}

/// Async in-memory byte store with the same semantics as [`DictStore`].
///
/// Operations never suspend; the store exists so async decorator stacks can
/// be exercised and used without a real backend.
#[derive(Debug, Default)]
pub struct AsyncDictStore {
    inner: DictStore,
}

impl AsyncDictStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `objects`.
    pub fn with_objects<I, K, V>(objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        Self {
            inner: DictStore::with_objects(objects),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> StoreResult<usize> {
        self.inner.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> StoreResult<bool> {
        self.inner.is_empty()
    }
}

#[async_trait]
impl AsyncObjectStore for AsyncDictStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        ObjectStore::get(&self.inner, key)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        ObjectStore::put(&self.inner, key, value)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        ObjectStore::exists(&self.inner, key)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        ObjectStore::delete(&self.inner, key)
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        let keys = self.inner.sorted_keys()?;
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = DictStore::new();
        store.put("hello", b"world".to_vec()).unwrap();
        assert_eq!(store.get("hello").unwrap(), b"world");
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = DictStore::new();
        let err = store.get("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn put_overwrites() {
        let store = DictStore::new();
        store.put("k", b"one".to_vec()).unwrap();
        store.put("k", b"two".to_vec()).unwrap();
        assert_eq!(store.get("k").unwrap(), b"two");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn put_is_idempotent() {
        let store = DictStore::new();
        store.put("k", b"v".to_vec()).unwrap();
        let keys_once: Vec<String> = store.keys().unwrap().map(Result::unwrap).collect();
        store.put("k", b"v".to_vec()).unwrap();
        let keys_twice: Vec<String> = store.keys().unwrap().map(Result::unwrap).collect();
        assert_eq!(keys_once, keys_twice);
        assert_eq!(store.get("k").unwrap(), b"v");
    }

    // -----------------------------------------------------------------------
    // Exists / Delete
    // -----------------------------------------------------------------------

    #[test]
    fn exists_never_fails_on_missing() {
        let store = DictStore::new();
        assert!(!store.exists("nope").unwrap());
        store.put("yes", Vec::new()).unwrap();
        assert!(store.exists("yes").unwrap());
    }

    #[test]
    fn delete_present_then_missing() {
        let store = DictStore::with_objects([("k", b"v".to_vec())]);
        store.delete("k").unwrap();
        assert!(!store.exists("k").unwrap());
        assert!(store.delete("k").unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn keys_are_sorted_snapshot() {
        let store = DictStore::with_objects([("b", b"2".to_vec()), ("a", b"1".to_vec())]);
        let mut iter = store.keys().unwrap();
        // Mutating during iteration must not deadlock or disturb the snapshot.
        store.put("c", b"3".to_vec()).unwrap();
        assert_eq!(iter.next().unwrap().unwrap(), "a");
        assert_eq!(iter.next().unwrap().unwrap(), "b");
        assert!(iter.next().is_none());
    }

    #[test]
    fn keys_with_prefix_filters() {
        let store = DictStore::with_objects([
            ("x/1", b"".to_vec()),
            ("x/2", b"".to_vec()),
            ("y/3", b"".to_vec()),
        ]);
        let keys: Vec<String> = store
            .keys_with_prefix("x/")
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        assert_eq!(keys, vec!["x/1", "x/2"]);
    }

    #[test]
    fn debug_format() {
        let store = DictStore::with_objects([("x", b"1".to_vec())]);
        let debug = format!("{store:?}");
        assert!(debug.contains("DictStore"));
        assert!(debug.contains("object_count"));
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(DictStore::with_objects([("shared", b"data".to_vec())]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    assert_eq!(store.get("shared").unwrap(), b"data");
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    // -----------------------------------------------------------------------
    // Async flavor
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn async_dict_round_trip() {
        let store = AsyncDictStore::new();
        AsyncObjectStore::put(&store, "k", b"v".to_vec()).await.unwrap();
        assert!(AsyncObjectStore::exists(&store, "k").await.unwrap());
        assert_eq!(AsyncObjectStore::get(&store, "k").await.unwrap(), b"v");
        let keys: Vec<String> = AsyncObjectStore::keys(&store)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["k"]);
        AsyncObjectStore::delete(&store, "k").await.unwrap();
        assert!(AsyncObjectStore::delete(&store, "k")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
