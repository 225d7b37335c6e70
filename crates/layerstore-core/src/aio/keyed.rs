use async_trait::async_trait;
use futures::future;
use futures::stream::StreamExt;

use crate::error::{StoreError, StoreResult};
use crate::traits::{AsyncObjectStore, KeyStream};
use crate::transform::{
    HashPrefixKeyTransformer, HttpUrlValidator, KeyTransformer, KeyValidator,
    PrefixKeyTransformer, RegexValidator, UrlEncodingKeyTransformer, ValidatingKeyTransformer,
};

/// Async [`KeyTransformingStore`](crate::decorators::KeyTransformingStore).
#[derive(Debug)]
pub struct AsyncKeyTransformingStore<S, K> {
    inner: S,
    transformer: K,
}

pub type AsyncPrefixStore<S> = AsyncKeyTransformingStore<S, PrefixKeyTransformer>;
pub type AsyncHashPrefixStore<S> = AsyncKeyTransformingStore<S, HashPrefixKeyTransformer>;
pub type AsyncUrlEncodingStore<S> = AsyncKeyTransformingStore<S, UrlEncodingKeyTransformer>;
pub type AsyncKeyValidatingStore<S, V> =
    AsyncKeyTransformingStore<S, ValidatingKeyTransformer<V>>;
pub type AsyncRegexValidatingStore<S> = AsyncKeyValidatingStore<S, RegexValidator>;
pub type AsyncUrlValidatingStore<S> = AsyncKeyValidatingStore<S, HttpUrlValidator>;

impl<S, K> AsyncKeyTransformingStore<S, K> {
    pub fn new(inner: S, transformer: K) -> Self {
        Self { inner, transformer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S> AsyncPrefixStore<S> {
    pub fn with_prefix(inner: S, prefix: impl Into<String>) -> Self {
        Self::new(inner, PrefixKeyTransformer::new(prefix))
    }
}

impl<S> AsyncHashPrefixStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, HashPrefixKeyTransformer::default())
    }
}

impl<S> AsyncUrlEncodingStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, UrlEncodingKeyTransformer)
    }
}

impl<S, V: KeyValidator> AsyncKeyValidatingStore<S, V> {
    pub fn with_validator(inner: S, validator: V) -> Self {
        Self::new(inner, ValidatingKeyTransformer::new(validator))
    }
}

impl<S> AsyncRegexValidatingStore<S> {
    pub fn with_pattern(inner: S, pattern: &str) -> StoreResult<Self> {
        Ok(Self::with_validator(inner, RegexValidator::new(pattern)?))
    }
}

impl<S> AsyncUrlValidatingStore<S> {
    pub fn wrap(inner: S) -> Self {
        Self::with_validator(inner, HttpUrlValidator)
    }
}

#[async_trait]
impl<S, K> AsyncObjectStore for AsyncKeyTransformingStore<S, K>
where
    S: AsyncObjectStore,
    K: KeyTransformer,
{
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        let key = self.transformer.transform_key(key)?;
        self.inner.get(&key).await
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        let key = self.transformer.transform_key(key)?;
        self.inner.put(&key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let key = self.transformer.transform_key(key)?;
        self.inner.exists(&key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let key = self.transformer.transform_key(key)?;
        self.inner.delete(&key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        let keys = self.inner.keys().await?;
        let transformer = &self.transformer;
        Ok(keys
            .filter_map(move |item| {
                future::ready(match item {
                    Err(err) => Some(Err(err)),
                    Ok(key) => match transformer.reverse_transform_key(&key) {
                        Ok(original) => Some(Ok(original)),
                        Err(StoreError::KeyRejected { .. }) => None,
                        Err(err) => Some(Err(err)),
                    },
                })
            })
            .boxed())
    }

    async fn open(&self) -> StoreResult<()> {
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}
