use tracing::{error, info};

use crate::error::StoreResult;
use crate::traits::{KeyIter, ObjectStore};

const DEFAULT_NAME: &str = "store";

/// Emits one `info` event per operation, then delegates.
#[derive(Debug)]
pub struct LoggingStore<S> {
    inner: S,
    name: String,
}

impl<S> LoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self::with_name(inner, DEFAULT_NAME)
    }

    /// Label events with `name` instead of `"store"`.
    pub fn with_name(inner: S, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ObjectStore> ObjectStore for LoggingStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        info!(store = %self.name, key, "{} get {}", self.name, key);
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        info!(store = %self.name, key, "{} put {}", self.name, key);
        self.inner.put(key, value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        info!(store = %self.name, key, "{} exists {}", self.name, key);
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        info!(store = %self.name, key, "{} delete {}", self.name, key);
        self.inner.delete(key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        info!(store = %self.name, "{} keys", self.name);
        self.inner.keys()
    }

    fn open(&self) -> StoreResult<()> {
        self.inner.open()
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}

/// A logging facade that never returns an error.
///
/// Each failure from the wrapped store is logged at `error` level and
/// replaced by a neutral value: `None`, `false`, or an empty key list. The
/// facade does not implement [`ObjectStore`], so it can only sit at the top
/// of a stack, where callers opt into losing error detail.
#[derive(Debug)]
pub struct ExceptionLoggingStore<S> {
    inner: LoggingStore<S>,
}

impl<S: ObjectStore> ExceptionLoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: LoggingStore::new(inner),
        }
    }

    pub fn with_name(inner: S, name: impl Into<String>) -> Self {
        Self {
            inner: LoggingStore::with_name(inner, name),
        }
    }

    /// The logging store underneath, for scoped acquisition.
    pub fn store(&self) -> &LoggingStore<S> {
        &self.inner
    }

    pub fn get(&self, key: &str) -> Option<S::Value> {
        match self.inner.get(key) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(store = %self.inner.name, key, "failed to get {key}: {err}");
                None
            }
        }
    }

    pub fn put(&self, key: &str, value: S::Value) {
        if let Err(err) = self.inner.put(key, value) {
            error!(store = %self.inner.name, key, "failed to put {key}: {err}");
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.inner.exists(key).unwrap_or_else(|err| {
            error!(store = %self.inner.name, key, "failed to exists {key}: {err}");
            false
        })
    }

    /// Returns `true` if the key was deleted.
    pub fn delete(&self, key: &str) -> bool {
        match self.inner.delete(key) {
            Ok(()) => true,
            Err(err) => {
                error!(store = %self.inner.name, key, "failed to delete {key}: {err}");
                false
            }
        }
    }

    /// Every key, or an empty list if listing fails at any point.
    pub fn keys(&self) -> Vec<String> {
        let listed = self
            .inner
            .keys()
            .and_then(|keys| keys.collect::<StoreResult<Vec<_>>>());
        listed.unwrap_or_else(|err| {
            error!(store = %self.inner.name, "failed to get keys: {err}");
            Vec::new()
        })
    }
}
