use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::error::{StoreError, StoreResult};

/// Lazy, finite sequence of keys produced by [`ObjectStore::keys`].
///
/// Items are results so that a backend failing halfway through a listing can
/// report it instead of silently truncating.
pub type KeyIter<'a> = Box<dyn Iterator<Item = StoreResult<String>> + Send + 'a>;

/// Async counterpart of [`KeyIter`].
pub type KeyStream<'a> = BoxStream<'a, StoreResult<String>>;

/// Type-erased byte store, the currency of the declarative builder.
pub type DynStore = Arc<dyn ObjectStore<Value = Vec<u8>>>;

/// Type-erased async byte store.
pub type DynAsyncStore = Arc<dyn AsyncObjectStore<Value = Vec<u8>>>;

/// Key/value object store.
///
/// All implementations must satisfy these invariants:
/// - `put` is idempotent: writing the same value twice leaves the store in
///   the same observable state as writing it once.
/// - `get` and `delete` fail with [`StoreError::NotFound`] for an absent key,
///   unless the backend documents idempotent deletes.
/// - `exists` never fails because a key is missing.
/// - Unsupported operations fail with [`StoreError::NotSupported`], which is
///   distinguishable from an empty result.
/// - The store never interprets object contents beyond what its declared
///   [`Value`](ObjectStore::Value) type requires.
///
/// Stores holding an external resource (connection, file handle) acquire it
/// in [`open`](ObjectStore::open) and release it in
/// [`close`](ObjectStore::close). Use [`crate::scope::enter`] rather than
/// calling them directly so the release happens on every exit path.
pub trait ObjectStore: Send + Sync {
    /// The logical value stored under a key. Raw stores use `Vec<u8>`.
    type Value;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Self::Value>;

    /// Store `value` under `key`, overwriting any previous value.
    fn put(&self, key: &str, value: Self::Value) -> StoreResult<()>;

    /// Check whether `key` is present.
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remove `key`.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// List every key currently present. Order is backend-defined.
    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Err(StoreError::not_supported("this store", "keys"))
    }

    /// List keys starting with `prefix`.
    ///
    /// Default implementation filters [`keys`](ObjectStore::keys). Backends
    /// with a native prefix listing may override it.
    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        let keys = self.keys()?;
        Ok(Box::new(keys.filter(move |item| match item {
            Ok(key) => key.starts_with(prefix),
            Err(_) => true,
        })))
    }

    /// Acquire any external resource this store (or its children) holds.
    fn open(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Release what [`open`](ObjectStore::open) acquired.
    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    type Value = T::Value;

    fn get(&self, key: &str) -> StoreResult<Self::Value> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: Self::Value) -> StoreResult<()> {
        (**self).put(key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        (**self).keys()
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        (**self).keys_with_prefix(prefix)
    }

    fn open(&self) -> StoreResult<()> {
        (**self).open()
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

/// Concurrent flavor of [`ObjectStore`].
///
/// Same contract, same invariants; every operation is an independently
/// awaitable unit. I/O-bound implementations suspend at their I/O points,
/// CPU-bound work (compression) is offloaded by the decorators that perform
/// it.
#[async_trait]
pub trait AsyncObjectStore: Send + Sync {
    /// The logical value stored under a key. Raw stores use `Vec<u8>`.
    type Value: Send + 'static;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Self::Value>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn put(&self, key: &str, value: Self::Value) -> StoreResult<()>;

    /// Check whether `key` is present.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Stream every key currently present.
    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        Err(StoreError::not_supported("this store", "keys"))
    }

    /// Stream keys starting with `prefix`.
    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        let keys = self.keys().await?;
        Ok(keys
            .filter(move |item| {
                futures::future::ready(match item {
                    Ok(key) => key.starts_with(prefix),
                    Err(_) => true,
                })
            })
            .boxed())
    }

    /// Acquire any external resource this store (or its children) holds.
    async fn open(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Release what [`open`](AsyncObjectStore::open) acquired.
    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: AsyncObjectStore + ?Sized> AsyncObjectStore for Arc<T> {
    type Value = T::Value;

    async fn get(&self, key: &str) -> StoreResult<Self::Value> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Self::Value) -> StoreResult<()> {
        (**self).put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        (**self).exists(key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        (**self).delete(key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        (**self).keys().await
    }

    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        (**self).keys_with_prefix(prefix).await
    }

    async fn open(&self) -> StoreResult<()> {
        (**self).open().await
    }

    async fn close(&self) -> StoreResult<()> {
        (**self).close().await
    }
}
