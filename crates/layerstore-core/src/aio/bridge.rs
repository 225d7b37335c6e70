use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::task;

use crate::error::StoreResult;
use crate::traits::{AsyncObjectStore, KeyStream, ObjectStore};

/// Exposes a synchronous store through the async contract.
///
/// Every call runs on tokio's blocking pool, so a filesystem or SQLite
/// backend can sit under async decorators without stalling the scheduler.
/// Listings are collected on the blocking thread and streamed from memory.
#[derive(Debug)]
pub struct BlockingStore<S: ?Sized> {
    inner: Arc<S>,
}

impl<S: ?Sized> BlockingStore<S> {
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }
}

impl<S> BlockingStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::new(Arc::new(inner))
    }
}

impl<S: ?Sized> Clone for BlockingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<S> AsyncObjectStore for BlockingStore<S>
where
    S: ObjectStore + ?Sized + 'static,
    S::Value: Send + 'static,
{
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        let store = Arc::clone(&self.inner);
        let key = key.to_string();
        task::spawn_blocking(move || ObjectStore::get(&*store, &key)).await?
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        let store = Arc::clone(&self.inner);
        let key = key.to_string();
        task::spawn_blocking(move || ObjectStore::put(&*store, &key, value)).await?
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let store = Arc::clone(&self.inner);
        let key = key.to_string();
        task::spawn_blocking(move || ObjectStore::exists(&*store, &key)).await?
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let store = Arc::clone(&self.inner);
        let key = key.to_string();
        task::spawn_blocking(move || ObjectStore::delete(&*store, &key)).await?
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        let store = Arc::clone(&self.inner);
        let keys = task::spawn_blocking(move || {
            ObjectStore::keys(&*store)?.collect::<StoreResult<Vec<_>>>()
        })
        .await??;
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyStream<'a>> {
        let store = Arc::clone(&self.inner);
        let prefix = prefix.to_string();
        let keys = task::spawn_blocking(move || {
            ObjectStore::keys_with_prefix(&*store, &prefix)?.collect::<StoreResult<Vec<_>>>()
        })
        .await??;
        Ok(stream::iter(keys.into_iter().map(Ok)).boxed())
    }

    async fn open(&self) -> StoreResult<()> {
        let store = Arc::clone(&self.inner);
        task::spawn_blocking(move || ObjectStore::open(&*store)).await?
    }

    async fn close(&self) -> StoreResult<()> {
        let store = Arc::clone(&self.inner);
        task::spawn_blocking(move || ObjectStore::close(&*store)).await?
    }
}
