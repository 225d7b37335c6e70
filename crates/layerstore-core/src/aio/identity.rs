use async_trait::async_trait;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AsyncObjectStore, KeyStream};

/// Async [`IdentityStore`](crate::decorators::IdentityStore).
#[derive(Debug)]
pub struct AsyncIdentityStore<S> {
    inner: S,
}

impl<S> AsyncIdentityStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: AsyncObjectStore> AsyncObjectStore for AsyncIdentityStore<S> {
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.inner.put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        self.inner.keys().await
    }

    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        self.inner.keys_with_prefix(prefix).await
    }

    async fn open(&self) -> StoreResult<()> {
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// Async [`ReadonlyStore`](crate::decorators::ReadonlyStore).
#[derive(Debug)]
pub struct AsyncReadonlyStore<S> {
    inner: S,
}

impl<S> AsyncReadonlyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: AsyncObjectStore> AsyncObjectStore for AsyncReadonlyStore<S> {
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.inner.get(key).await
    }

    async fn put(&self, _key: &str, _value: S::Value) -> StoreResult<()> {
        Err(StoreError::not_supported("read-only store", "put"))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key).await
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::not_supported("read-only store", "delete"))
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        self.inner.keys().await
    }

    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        self.inner.keys_with_prefix(prefix).await
    }

    async fn open(&self) -> StoreResult<()> {
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// Async [`LoggingStore`](crate::decorators::LoggingStore).
#[derive(Debug)]
pub struct AsyncLoggingStore<S> {
    inner: S,
    name: String,
}

impl<S> AsyncLoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_name(inner, "store")
    }

    pub fn with_name(inner: S, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: AsyncObjectStore> AsyncObjectStore for AsyncLoggingStore<S> {
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        info!(store = %self.name, key, "{} get {}", self.name, key);
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        info!(store = %self.name, key, "{} put {}", self.name, key);
        self.inner.put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        info!(store = %self.name, key, "{} exists {}", self.name, key);
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        info!(store = %self.name, key, "{} delete {}", self.name, key);
        self.inner.delete(key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        info!(store = %self.name, "{} keys", self.name);
        self.inner.keys().await
    }

    async fn open(&self) -> StoreResult<()> {
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::memory::AsyncDictStore;
    use crate::scope::with_async_scope;
    use crate::testing::{Journal, ResourceStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn identity_and_logging_delegate() {
        let store = AsyncLoggingStore::new(AsyncIdentityStore::new(AsyncDictStore::new()));
        store.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), b"v");
        store.delete("k").await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn readonly_refuses_writes() {
        let store = AsyncReadonlyStore::new(AsyncDictStore::with_objects([("k", b"v".to_vec())]));
        assert_eq!(store.get("k").await.unwrap(), b"v");
        let err = store.put("x", b"y".to_vec()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(store.delete("k").await.unwrap_err().kind(), ErrorKind::NotSupported);
    }

    #[tokio::test]
    async fn single_child_forwards_scope() {
        let journal = Journal::new();
        let store = Arc::new(AsyncReadonlyStore::new(ResourceStore::new(
            "leaf",
            journal.clone(),
        )));
        with_async_scope(Arc::clone(&store), |s| async move {
            assert!(s.inner().is_open());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(journal.entries(), vec!["open leaf", "close leaf"]);
    }
}
