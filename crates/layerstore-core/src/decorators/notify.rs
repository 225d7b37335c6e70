use std::fmt;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KeyIter, ObjectStore};

/// The mutation a [`NotifyingStore`] handler is told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Put,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Put => f.write_str("put"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Callback registered on a [`NotifyingStore`].
///
/// Receives the child store, the mutation, the key, and the error the child
/// returned, if any.
pub type ChangeHandler<S> =
    Box<dyn Fn(&S, ChangeKind, &str, Option<&StoreError>) + Send + Sync>;

/// Calls registered handlers after every `put` and `delete`.
///
/// Handlers run whether the child call succeeded or failed. A failure is
/// returned to the caller after all handlers have seen it.
pub struct NotifyingStore<S> {
    inner: S,
    handlers: RwLock<Vec<ChangeHandler<S>>>,
}

impl<S> NotifyingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            handlers: RwLock::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Register a handler for every mutation.
    pub fn on_change<F>(&self, handler: F) -> StoreResult<()>
    where
        F: Fn(&S, ChangeKind, &str, Option<&StoreError>) + Send + Sync + 'static,
    {
        self.handlers.write()?.push(Box::new(handler));
        Ok(())
    }

    /// Register a handler for `put` only.
    pub fn on_put<F>(&self, handler: F) -> StoreResult<()>
    where
        F: Fn(&S, &str, Option<&StoreError>) + Send + Sync + 'static,
    {
        self.on_change(move |store, kind, key, err| {
            if kind == ChangeKind::Put {
                handler(store, key, err);
            }
        })
    }

    /// Register a handler for `delete` only.
    pub fn on_delete<F>(&self, handler: F) -> StoreResult<()>
    where
        F: Fn(&S, &str, Option<&StoreError>) + Send + Sync + 'static,
    {
        self.on_change(move |store, kind, key, err| {
            if kind == ChangeKind::Delete {
                handler(store, key, err);
            }
        })
    }

    fn notify(&self, kind: ChangeKind, key: &str, err: Option<&StoreError>) -> StoreResult<()> {
        for handler in self.handlers.read()?.iter() {
            handler(&self.inner, kind, key, err);
        }
        Ok(())
    }
}

impl<S: ObjectStore> ObjectStore for NotifyingStore<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        let result = self.inner.put(key, value);
        let notified = self.notify(ChangeKind::Put, key, result.as_ref().err());
        result?;
        notified
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let result = self.inner.delete(key);
        let notified = self.notify(ChangeKind::Delete, key, result.as_ref().err());
        result?;
        notified
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

impl<S: fmt::Debug> fmt::Debug for NotifyingStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().map(|h| h.len()).unwrap_or_default();
        f.debug_struct("NotifyingStore")
            .field("inner", &self.inner)
            .field("handlers", &handlers)
            .finish()
    }
}
