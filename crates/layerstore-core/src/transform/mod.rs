//! Reversible payload and key transformations.
//!
//! Transformers are strategy objects. A decorator store holds one child and
//! one transformer; the same transformer drives both the sync and the async
//! flavor of that decorator.

pub mod data;
pub mod filesystem;
pub mod key;

pub use data::{
    Base64Transformer, BufferTransformer, DataTransformer, GzipTransformer, IdentityTransformer,
    JsonTransformer, Reader, TextEncoding, TextEncodingTransformer, TransformCost,
    ZstdTransformer,
};
pub use filesystem::FilesystemSafeKeyTransformer;
pub use key::{
    HashAlgorithm, HashPrefixKeyTransformer, HttpUrlValidator, IdentityKeyTransformer,
    KeyTransformer, KeyValidator, PrefixKeyTransformer, RegexValidator, UrlEncodingKeyTransformer,
    ValidatingKeyTransformer,
};

use std::sync::Arc;

use crate::error::StoreResult;

impl<T: DataTransformer + ?Sized> DataTransformer for Arc<T> {
    type Value = T::Value;

    fn transform(&self, value: Self::Value) -> StoreResult<Vec<u8>> {
        (**self).transform(value)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Self::Value> {
        (**self).reverse_transform(data)
    }

    fn cost(&self) -> TransformCost {
        (**self).cost()
    }
}

impl<K: KeyTransformer + ?Sized> KeyTransformer for Arc<K> {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        (**self).transform_key(key)
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        (**self).reverse_transform_key(key)
    }
}
