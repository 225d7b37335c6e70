//! Test doubles for stores and decorators.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::error::{StoreError, StoreResult};
use crate::memory::DictStore;
use crate::traits::{AsyncObjectStore, KeyIter, KeyStream, ObjectStore};

/// Shared, ordered log of events recorded by the doubles in this module.
#[derive(Clone, Debug, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry.into());
        }
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.0.lock() {
            entries.clear();
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceStore
// ---------------------------------------------------------------------------

/// A byte store modelling an external resource.
///
/// Records `open <name>` / `close <name>` (or `... failed`) in its journal.
/// Every data operation fails unless the store is open.
#[derive(Debug)]
pub struct ResourceStore {
    name: String,
    journal: Journal,
    objects: DictStore,
    open: AtomicBool,
    fail_open: bool,
    fail_close: bool,
}

impl ResourceStore {
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
            objects: DictStore::new(),
            open: AtomicBool::new(false),
            fail_open: false,
            fail_close: false,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn open_resource(&self) -> StoreResult<()> {
        if self.fail_open {
            self.journal.record(format!("open {} failed", self.name));
            return Err(StoreError::backend(format!("cannot open {}", self.name)));
        }
        self.open.store(true, Ordering::SeqCst);
        self.journal.record(format!("open {}", self.name));
        Ok(())
    }

    fn close_resource(&self) -> StoreResult<()> {
        self.open.store(false, Ordering::SeqCst);
        if self.fail_close {
            self.journal.record(format!("close {} failed", self.name));
            return Err(StoreError::backend(format!("cannot close {}", self.name)));
        }
        self.journal.record(format!("close {}", self.name));
        Ok(())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::backend(format!("{} is not open", self.name)))
        }
    }
}

impl ObjectStore for ResourceStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        ObjectStore::get(&self.objects, key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_open()?;
        ObjectStore::put(&self.objects, key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        ObjectStore::exists(&self.objects, key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_open()?;
        ObjectStore::delete(&self.objects, key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        self.ensure_open()?;
        ObjectStore::keys(&self.objects)
    }

    fn open(&self) -> StoreResult<()> {
        self.open_resource()
    }

    fn close(&self) -> StoreResult<()> {
        self.close_resource()
    }
}

#[async_trait]
impl AsyncObjectStore for ResourceStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        ObjectStore::get(self, key)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        ObjectStore::put(self, key, value)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        ObjectStore::exists(self, key)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        ObjectStore::delete(self, key)
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        let keys = ObjectStore::keys(self)?.collect::<Vec<_>>();
        Ok(stream::iter(keys).boxed())
    }

    async fn open(&self) -> StoreResult<()> {
        self.open_resource()
    }

    async fn close(&self) -> StoreResult<()> {
        self.close_resource()
    }
}

// ---------------------------------------------------------------------------
// PendingOpenStore
// ---------------------------------------------------------------------------

/// An async store whose `open` never completes.
///
/// Records `opening <name>` when the open starts. Used to cancel a caller
/// while it is part-way through entering a multi-child decorator.
#[derive(Debug)]
pub struct PendingOpenStore {
    name: String,
    journal: Journal,
}

impl PendingOpenStore {
    pub fn new(name: impl Into<String>, journal: Journal) -> Self {
        Self {
            name: name.into(),
            journal,
        }
    }
}

#[async_trait]
impl AsyncObjectStore for PendingOpenStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        Err(StoreError::not_found(key))
    }

    async fn put(&self, _key: &str, _value: Vec<u8>) -> StoreResult<()> {
        Err(StoreError::backend(format!("{} is not open", self.name)))
    }

    async fn exists(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        Err(StoreError::not_found(key))
    }

    async fn open(&self) -> StoreResult<()> {
        self.journal.record(format!("opening {}", self.name));
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

/// Journals every call before delegating, as `"<op> <key>"`.
///
/// A named recorder prefixes entries with its name (`"cache put k"`), so
/// several recorders can share one journal to check call ordering.
#[derive(Debug)]
pub struct RecordingStore<S> {
    inner: S,
    journal: Journal,
    prefix: String,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S, journal: Journal) -> Self {
        Self {
            inner,
            journal,
            prefix: String::new(),
        }
    }

    pub fn named(name: &str, inner: S, journal: Journal) -> Self {
        Self {
            inner,
            journal,
            prefix: format!("{name} "),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn record(&self, op: &str, key: Option<&str>) {
        match key {
            Some(key) => self.journal.record(format!("{}{op} {key}", self.prefix)),
            None => self.journal.record(format!("{}{op}", self.prefix)),
        }
    }
}

impl<S: ObjectStore> ObjectStore for RecordingStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.record("get", Some(key));
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.record("put", Some(key));
        self.inner.put(key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.record("exists", Some(key));
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.record("delete", Some(key));
        self.inner.delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        self.record("keys", None);
        self.inner.keys()
    }

    fn open(&self) -> StoreResult<()> {
        self.record("open", None);
        self.inner.open()
    }

    fn close(&self) -> StoreResult<()> {
        self.record("close", None);
        self.inner.close()
    }
}

#[async_trait]
impl<S: AsyncObjectStore> AsyncObjectStore for RecordingStore<S> {
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.record("get", Some(key));
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.record("put", Some(key));
        self.inner.put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.record("exists", Some(key));
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.record("delete", Some(key));
        self.inner.delete(key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        self.record("keys", None);
        self.inner.keys().await
    }

    async fn open(&self) -> StoreResult<()> {
        self.record("open", None);
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.record("close", None);
        self.inner.close().await
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// Fails selected operations with a backend error; delegates the rest.
///
/// Operation names: `get`, `put`, `exists`, `delete`, `keys`, `open`, `close`.
#[derive(Debug)]
pub struct FailingStore<S> {
    inner: S,
    failing: HashSet<String>,
}

impl<S> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: HashSet::new(),
        }
    }

    pub fn failing(mut self, operations: &[&str]) -> Self {
        self.failing
            .extend(operations.iter().map(|op| op.to_string()));
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, operation: &str) -> StoreResult<()> {
        if self.failing.contains(operation) {
            Err(StoreError::backend(format!("injected {operation} failure")))
        } else {
            Ok(())
        }
    }
}

impl<S: ObjectStore> ObjectStore for FailingStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.check("get")?;
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.check("put")?;
        self.inner.put(key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check("exists")?;
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check("delete")?;
        self.inner.delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        self.check("keys")?;
        self.inner.keys()
    }

    fn open(&self) -> StoreResult<()> {
        self.check("open")?;
        self.inner.open()
    }

    fn close(&self) -> StoreResult<()> {
        self.check("close")?;
        self.inner.close()
    }
}

#[async_trait]
impl<S: AsyncObjectStore> AsyncObjectStore for FailingStore<S> {
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        self.check("put")?;
        self.inner.put(key, value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check("exists")?;
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check("delete")?;
        self.inner.delete(key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        self.check("keys")?;
        self.inner.keys().await
    }

    async fn open(&self) -> StoreResult<()> {
        self.check("open")?;
        self.inner.open().await
    }

    async fn close(&self) -> StoreResult<()> {
        self.check("close")?;
        self.inner.close().await
    }
}
