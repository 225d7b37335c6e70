use crate::error::StoreResult;
use crate::traits::{KeyIter, ObjectStore};
use crate::transform::{
    Base64Transformer, BufferTransformer, DataTransformer, GzipTransformer, JsonTransformer,
    TextEncodingTransformer, ZstdTransformer,
};

/// Applies a [`DataTransformer`] to payloads on their way in and out.
///
/// The child stores bytes; callers see the transformer's `Value` type.
/// Keys and existence checks pass through untouched.
#[derive(Debug)]
pub struct TransformingStore<S, T> {
    inner: S,
    transformer: T,
}

pub type TextEncodingStore<S> = TransformingStore<S, TextEncodingTransformer>;
pub type GzipStore<S> = TransformingStore<S, GzipTransformer>;
pub type ZstdStore<S> = TransformingStore<S, ZstdTransformer>;
pub type BufferStore<S> = TransformingStore<S, BufferTransformer>;
pub type Base64Store<S> = TransformingStore<S, Base64Transformer>;
pub type JsonStore<S> = TransformingStore<S, JsonTransformer>;

impl<S, T> TransformingStore<S, T> {
    pub fn new(inner: S, transformer: T) -> Self {
        Self { inner, transformer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn transformer(&self) -> &T {
        &self.transformer
    }
}

impl<S, T: Default> TransformingStore<S, T> {
    /// Wrap `inner` with the transformer's default settings.
    pub fn wrap(inner: S) -> Self {
        Self::new(inner, T::default())
    }
}

impl<S, T> ObjectStore for TransformingStore<S, T>
where
    S: ObjectStore<Value = Vec<u8>>,
    T: DataTransformer,
{
    type Value = T::Value;

    fn get(&self, key: &str) -> StoreResult<T::Value> {
        let data = self.inner.get(key)?;
        self.transformer.reverse_transform(data)
    }

    fn put(&self, key: &str, value: T::Value) -> StoreResult<()> {
        let data = self.transformer.transform(value)?;
        self.inner.put(key, data)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        self.inner.keys()
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        self.inner.keys_with_prefix(prefix)
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
    use crate::error::{ErrorKind, StoreError};
    use crate::memory::DictStore;
    use crate::transform::TextEncoding;
    use std::io::Read;

    #[test]
    fn text_store_encodes_on_put() {
        let store = TextEncodingStore::wrap(DictStore::new());
        store.put("k", "héllo".to_string()).unwrap();
        assert_eq!(store.inner().get("k").unwrap(), "héllo".as_bytes());
        assert_eq!(store.get("k").unwrap(), "héllo");
    }

    #[test]
    fn latin1_store_rejects_unencodable_text() {
        let store = TextEncodingStore::new(
            DictStore::new(),
            TextEncodingTransformer::new(TextEncoding::Latin1),
        );
        store.put("k", "café".to_string()).unwrap();
        assert_eq!(store.inner().get("k").unwrap(), b"caf\xe9");
        let err = store.put("x", "日本".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
        assert!(!store.exists("x").unwrap());
    }

    #[test]
    fn gzip_store_stores_compressed_bytes() {
        let store = GzipStore::wrap(DictStore::new());
        let payload = b"abcabcabc".repeat(100);
        store.put("k", payload.clone()).unwrap();
        let raw = store.inner().get("k").unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert!(raw.len() < payload.len());
        assert_eq!(store.get("k").unwrap(), payload);
    }

    #[test]
    fn zstd_store_round_trips() {
        let store = ZstdStore::wrap(DictStore::new());
        store.put("k", b"zstd data".to_vec()).unwrap();
        assert_eq!(store.get("k").unwrap(), b"zstd data");
    }

    #[test]
    fn corrupt_payload_is_a_codec_error() {
        let store = GzipStore::wrap(DictStore::with_objects([("k", b"not gzip".to_vec())]));
        assert_eq!(store.get("k").unwrap_err().kind(), ErrorKind::Backend);
    }

    #[test]
    fn buffer_store_returns_fresh_reader() {
        let store = BufferStore::wrap(DictStore::new());
        store
            .put("k", Box::new(std::io::Cursor::new(b"stream".to_vec())))
            .unwrap();
        let mut out = String::new();
        store.get("k").unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "stream");
    }

    #[test]
    fn base64_store_writes_ascii() {
        let store = Base64Store::wrap(DictStore::new());
        store.put("k", b"\x00\xff".to_vec()).unwrap();
        assert_eq!(store.inner().get("k").unwrap(), b"AP8=");
        assert_eq!(store.get("k").unwrap(), b"\x00\xff");
    }

    #[test]
    fn json_store_round_trips_documents() {
        let store = JsonStore::wrap(DictStore::new());
        let doc = serde_json::json!({"name": "layer", "tags": [1, 2, 3]});
        store.put("doc", doc.clone()).unwrap();
        assert_eq!(store.get("doc").unwrap(), doc);
        let raw = String::from_utf8(store.inner().get("doc").unwrap()).unwrap();
        assert!(raw.contains("\"name\""));
    }

    #[test]
    fn keys_and_delete_pass_through() {
        let store = GzipStore::wrap(DictStore::new());
        store.put("a", b"1".to_vec()).unwrap();
        store.put("b", b"2".to_vec()).unwrap();
        let keys: Vec<String> = store.keys().unwrap().collect::<StoreResult<_>>().unwrap();
        assert_eq!(keys, vec!["a", "b"]);
        store.delete("a").unwrap();
        assert!(!store.exists("a").unwrap());
    }
}
