use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use crate::error::StoreResult;
use crate::traits::{AsyncObjectStore, KeyStream};
use crate::transform::{
    Base64Transformer, BufferTransformer, DataTransformer, GzipTransformer, JsonTransformer,
    TextEncodingTransformer, TransformCost, ZstdTransformer,
};

/// Async [`TransformingStore`](crate::decorators::TransformingStore).
///
/// Transforms whose [`cost`](DataTransformer::cost) is
/// [`Blocking`](TransformCost::Blocking) run on tokio's blocking pool; the
/// rest run inline. [`offload`](Self::offload) overrides the choice for this
/// instance.
#[derive(Debug)]
pub struct AsyncTransformingStore<S, T> {
    inner: S,
    transformer: Arc<T>,
    offload: bool,
}

pub type AsyncTextEncodingStore<S> = AsyncTransformingStore<S, TextEncodingTransformer>;
pub type AsyncGzipStore<S> = AsyncTransformingStore<S, GzipTransformer>;
pub type AsyncZstdStore<S> = AsyncTransformingStore<S, ZstdTransformer>;
pub type AsyncBufferStore<S> = AsyncTransformingStore<S, BufferTransformer>;
pub type AsyncBase64Store<S> = AsyncTransformingStore<S, Base64Transformer>;
pub type AsyncJsonStore<S> = AsyncTransformingStore<S, JsonTransformer>;

impl<S, T: DataTransformer> AsyncTransformingStore<S, T> {
    pub fn new(inner: S, transformer: T) -> Self {
        let offload = transformer.cost() == TransformCost::Blocking;
        Self {
            inner,
            transformer: Arc::new(transformer),
            offload,
        }
    }

    /// Force transforms onto the blocking pool (`true`) or inline (`false`).
    pub fn offload(mut self, offload: bool) -> Self {
        self.offload = offload;
        self
    }

    pub fn is_offloaded(&self) -> bool {
        self.offload
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, T: DataTransformer + Default> AsyncTransformingStore<S, T> {
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, T::default())
    }
}

impl<S, T> AsyncTransformingStore<S, T>
where
    T: DataTransformer + 'static,
    T::Value: Send + 'static,
{
    async fn encode(&self, value: T::Value) -> StoreResult<Vec<u8>> {
        if self.offload {
            let transformer = Arc::clone(&self.transformer);
            task::spawn_blocking(move || transformer.transform(value)).await?
        } else {
            self.transformer.transform(value)
        }
    }

    async fn decode(&self, data: Vec<u8>) -> StoreResult<T::Value> {
        if self.offload {
            let transformer = Arc::clone(&self.transformer);
            task::spawn_blocking(move || transformer.reverse_transform(data)).await?
        } else {
            self.transformer.reverse_transform(data)
        }
    }
}

#[async_trait]
impl<S, T> AsyncObjectStore for AsyncTransformingStore<S, T>
where
    S: AsyncObjectStore<Value = Vec<u8>>,
    T: DataTransformer + 'static,
    T::Value: Send + 'static,
{
    type Value = T::Value;

    async fn get(&self, key: &str) -> StoreResult<T::Value> {
        let data = self.inner.get(key).await?;
        self.decode(data).await
    }

    async fn put(&self, key: &str, value: T::Value) -> StoreResult<()> {
        let data = self.encode(value).await?;
        self.inner.put(key, data).await
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
