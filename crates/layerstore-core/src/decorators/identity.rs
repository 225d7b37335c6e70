use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyIter, ObjectStore};

/// Delegates every operation to its child unchanged.
#[derive(Debug)]
pub struct IdentityStore<S> {
    inner: S,
}

impl<S> IdentityStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ObjectStore> ObjectStore for IdentityStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.inner.put(key, value)
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

/// Serves reads from its child and refuses writes.
#[derive(Debug)]
pub struct ReadonlyStore<S> {
    inner: S,
}

impl<S> ReadonlyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ObjectStore> ObjectStore for ReadonlyStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.inner.get(key)
    }

    fn put(&self, _key: &str, _value: S::Value) -> StoreResult<()> {
        Err(StoreError::not_supported("read-only store", "put"))
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key)
    }

    fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::not_supported("read-only store", "delete"))
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

/// Accepts writes and deletes; refuses every read.
#[derive(Debug)]
pub struct WriteonlyStore<S> {
    inner: S,
}

impl<S> WriteonlyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ObjectStore> ObjectStore for WriteonlyStore<S> {
    type Value = S::Value;

    fn get(&self, _key: &str) -> StoreResult<S::Value> {
        Err(StoreError::not_supported("write-only store", "get"))
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.inner.put(key, value)
    }

    fn exists(&self, _key: &str) -> StoreResult<bool> {
        Err(StoreError::not_supported("write-only store", "exists"))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Err(StoreError::not_supported("write-only store", "keys"))
    }

    fn keys_with_prefix<'a>(&'a self, _prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        Err(StoreError::not_supported("write-only store", "keys"))
    }

    fn open(&self) -> StoreResult<()> {
        self.inner.open()
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}
