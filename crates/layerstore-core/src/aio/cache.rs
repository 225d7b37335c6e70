use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::debug;

use crate::error::StoreResult;
use crate::scope::{close_all_async, open_all_async, AsyncResource};
use crate::traits::{AsyncObjectStore, KeyStream};

/// Async [`CachingStore`](crate::decorators::CachingStore).
///
/// Misses are not coalesced: two tasks missing on the same key both read
/// main and both fill the cache.
#[derive(Debug)]
pub struct AsyncCachingStore<M, C> {
    main: Arc<M>,
    cache: Arc<C>,
}

impl<M, C> AsyncCachingStore<M, C> {
    pub fn new(main: M, cache: C) -> Self {
        Self {
            main: Arc::new(main),
            cache: Arc::new(cache),
        }
    }

    pub fn main(&self) -> &M {
        &self.main
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<M, C> AsyncCachingStore<M, C>
where
    M: AsyncObjectStore + 'static,
    C: AsyncObjectStore<Value = M::Value> + 'static,
{
    fn resources(&self) -> [Arc<dyn AsyncResource>; 2] {
        [
            Arc::clone(&self.main) as Arc<dyn AsyncResource>,
            Arc::clone(&self.cache) as Arc<dyn AsyncResource>,
        ]
    }

    /// Evict `key` from the cache, or the whole cache when `key` is `None`.
    pub async fn clear(&self, key: Option<&str>) -> StoreResult<()> {
        match key {
            Some(key) => {
                if self.cache.exists(key).await? {
                    self.cache.delete(key).await?;
                }
            }
            None => {
                let cached: Vec<String> = self.cache.keys().await?.try_collect().await?;
                debug!(count = cached.len(), "evicting cache");
                for key in cached {
                    self.cache.delete(&key).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<M, C> AsyncObjectStore for AsyncCachingStore<M, C>
where
    M: AsyncObjectStore + 'static,
    M::Value: Clone,
    C: AsyncObjectStore<Value = M::Value> + 'static,
{
    type Value = M::Value;

    async fn get(&self, key: &str) -> StoreResult<M::Value> {
        if self.cache.exists(key).await? {
            return self.cache.get(key).await;
        }
        let value = self.main.get(key).await?;
        debug!(key, "cache miss");
        self.cache.put(key, value.clone()).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: M::Value) -> StoreResult<()> {
        self.main.put(key, value.clone()).await?;
        self.cache.put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.cache.exists(key).await? || self.main.exists(key).await?)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.main.delete(key).await?;
        if self.cache.exists(key).await? {
            self.cache.delete(key).await?;
        }
        Ok(())
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        self.main.keys().await
    }

    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        self.main.keys_with_prefix(prefix).await
    }

    async fn open(&self) -> StoreResult<()> {
        open_all_async(&self.resources()).await
    }

    async fn close(&self) -> StoreResult<()> {
        close_all_async(&self.resources()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::AsyncDictStore;

    #[tokio::test]
    async fn read_through_and_eviction() {
        let store = AsyncCachingStore::new(
            AsyncDictStore::with_objects([("k", b"v".to_vec())]),
            AsyncDictStore::new(),
        );
        assert_eq!(store.get("k").await.unwrap(), b"v");
        assert_eq!(store.cache().get("k").await.unwrap(), b"v");

        store.clear(Some("k")).await.unwrap();
        assert!(!store.cache().exists("k").await.unwrap());
        assert!(store.exists("k").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), b"v");
        assert!(store.cache().exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn put_delete_and_clear_all() {
        let store = AsyncCachingStore::new(AsyncDictStore::new(), AsyncDictStore::new());
        store.put("a", b"1".to_vec()).await.unwrap();
        store.put("b", b"2".to_vec()).await.unwrap();
        store.delete("a").await.unwrap();
        assert!(!store.cache().exists("a").await.unwrap());

        store.clear(None).await.unwrap();
        assert!(store.cache().is_empty().unwrap());
        assert_eq!(store.main().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_both_succeed() {
        let store = std::sync::Arc::new(AsyncCachingStore::new(
            AsyncDictStore::with_objects([("k", b"v".to_vec())]),
            AsyncDictStore::new(),
        ));
        let (a, b) = tokio::join!(store.get("k"), store.get("k"));
        assert_eq!(a.unwrap(), b"v");
        assert_eq!(b.unwrap(), b"v");
        assert_eq!(store.cache().len().unwrap(), 1);
    }
}
