use tracing::debug;

use crate::error::StoreResult;
use crate::scope::{close_all, open_all};
use crate::traits::{KeyIter, ObjectStore};

/// Read-through cache in front of a main store.
///
/// Writes go to main, then cache. A read checks the cache first and fills it
/// from main on a miss. Concurrent misses on the same key may both read main;
/// the last fill wins.
#[derive(Debug)]
pub struct CachingStore<M, C> {
    main: M,
    cache: C,
}

impl<M, C> CachingStore<M, C> {
    pub fn new(main: M, cache: C) -> Self {
        Self { main, cache }
    }

    pub fn main(&self) -> &M {
        &self.main
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<M, C> CachingStore<M, C>
where
    M: ObjectStore,
    C: ObjectStore<Value = M::Value>,
{
    /// Evict `key` from the cache, or the whole cache when `key` is `None`.
    ///
    /// The main store is never touched.
    pub fn clear(&self, key: Option<&str>) -> StoreResult<()> {
        match key {
            Some(key) => {
                if self.cache.exists(key)? {
                    self.cache.delete(key)?;
                }
            }
            None => {
                let cached = self.cache.keys()?.collect::<StoreResult<Vec<_>>>()?;
                debug!(count = cached.len(), "evicting cache");
                for key in cached {
                    self.cache.delete(&key)?;
                }
            }
        }
        Ok(())
    }
}

impl<M, C> ObjectStore for CachingStore<M, C>
where
    M: ObjectStore,
    M::Value: Clone,
    C: ObjectStore<Value = M::Value>,
{
    type Value = M::Value;

    fn get(&self, key: &str) -> StoreResult<M::Value> {
        if self.cache.exists(key)? {
            return self.cache.get(key);
        }
        let value = self.main.get(key)?;
        debug!(key, "cache miss");
        self.cache.put(key, value.clone())?;
        Ok(value)
    }

    fn put(&self, key: &str, value: M::Value) -> StoreResult<()> {
        self.main.put(key, value.clone())?;
        self.cache.put(key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.cache.exists(key)? || self.main.exists(key)?)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.main.delete(key)?;
        if self.cache.exists(key)? {
            self.cache.delete(key)?;
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        self.main.keys()
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        self.main.keys_with_prefix(prefix)
    }

    fn open(&self) -> StoreResult<()> {
        open_all(&[&self.main, &self.cache])
    }

    fn close(&self) -> StoreResult<()> {
        close_all(&[&self.main, &self.cache])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DictStore;
    use crate::scope::enter;
    use crate::testing::{Journal, RecordingStore, ResourceStore};

    fn cached() -> CachingStore<DictStore, DictStore> {
        CachingStore::new(DictStore::new(), DictStore::new())
    }

    #[test]
    fn put_writes_main_then_cache() {
        let journal = Journal::new();
        let store = CachingStore::new(
            RecordingStore::named("main", DictStore::new(), journal.clone()),
            RecordingStore::named("cache", DictStore::new(), journal.clone()),
        );
        store.put("k", b"v".to_vec()).unwrap();
        assert_eq!(journal.entries(), vec!["main put k", "cache put k"]);
    }

    #[test]
    fn cache_coherence_after_put_and_eviction() {
        let store = cached();
        store.put("k", b"v".to_vec()).unwrap();
        assert_eq!(store.get("k").unwrap(), b"v");
        assert_eq!(store.cache().get("k").unwrap(), b"v");

        store.clear(Some("k")).unwrap();
        assert!(!store.cache().exists("k").unwrap());
        assert_eq!(store.get("k").unwrap(), b"v");
        assert!(store.cache().exists("k").unwrap());
    }

    #[test]
    fn miss_populates_cache_from_main() {
        let store = CachingStore::new(
            DictStore::with_objects([("k", b"main".to_vec())]),
            DictStore::new(),
        );
        assert_eq!(store.get("k").unwrap(), b"main");
        assert_eq!(store.cache().get("k").unwrap(), b"main");
        assert!(store.get("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn cache_is_consulted_first() {
        let store = CachingStore::new(
            DictStore::with_objects([("k", b"main".to_vec())]),
            DictStore::with_objects([("k", b"stale".to_vec())]),
        );
        assert_eq!(store.get("k").unwrap(), b"stale");
    }

    #[test]
    fn exists_checks_either_side() {
        let store = CachingStore::new(
            DictStore::with_objects([("m", b"".to_vec())]),
            DictStore::with_objects([("c", b"".to_vec())]),
        );
        assert!(store.exists("m").unwrap());
        assert!(store.exists("c").unwrap());
        assert!(!store.exists("x").unwrap());
    }

    #[test]
    fn delete_removes_from_both() {
        let store = cached();
        store.put("k", b"v".to_vec()).unwrap();
        store.put("main-only", b"v".to_vec()).unwrap();
        store.clear(Some("main-only")).unwrap();
        store.delete("k").unwrap();
        store.delete("main-only").unwrap();
        assert!(!store.exists("k").unwrap());
        assert!(store.main().is_empty().unwrap());
        assert!(store.cache().is_empty().unwrap());
        assert!(store.delete("k").unwrap_err().is_not_found());
    }

    #[test]
    fn clear_all_leaves_main_intact() {
        let store = cached();
        for key in ["a", "b", "c"] {
            store.put(key, b"v".to_vec()).unwrap();
        }
        store.clear(None).unwrap();
        assert!(store.cache().is_empty().unwrap());
        assert_eq!(store.main().len().unwrap(), 3);
        let keys: Vec<String> = store.keys().unwrap().collect::<StoreResult<_>>().unwrap();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn scope_opens_main_then_cache() {
        let journal = Journal::new();
        let store = CachingStore::new(
            ResourceStore::new("main", journal.clone()),
            ResourceStore::new("cache", journal.clone()).failing_open(),
        );
        assert!(enter(&store).is_err());
        assert_eq!(
            journal.entries(),
            vec!["open main", "open cache failed", "close main"]
        );
    }
}
