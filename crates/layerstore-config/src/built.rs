//! The result of building one definition.

use std::fmt;
use std::sync::Arc;

use layerstore_core::decorators::ExceptionLoggingStore;
use layerstore_core::transform::Reader;
use layerstore_core::{AsyncObjectStore, DynAsyncStore, DynStore, ObjectStore};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

pub type TextStore = Arc<dyn ObjectStore<Value = String>>;
pub type JsonValueStore = Arc<dyn ObjectStore<Value = Value>>;
pub type StreamStore = Arc<dyn ObjectStore<Value = Reader>>;
pub type GuardedStore = Arc<ExceptionLoggingStore<DynStore>>;
pub type AsyncTextStore = Arc<dyn AsyncObjectStore<Value = String>>;
pub type AsyncJsonValueStore = Arc<dyn AsyncObjectStore<Value = Value>>;

/// A type-erased store, tagged by flavor and value type.
///
/// Only byte stores can serve as the base of another definition; the other
/// variants sit at the top of a stack.
#[derive(Clone)]
pub enum BuiltStore {
    Bytes(DynStore),
    Text(TextStore),
    Json(JsonValueStore),
    Stream(StreamStore),
    /// Error-absorbing facade; not itself a store.
    Guarded(GuardedStore),
    AsyncBytes(DynAsyncStore),
    AsyncText(AsyncTextStore),
    AsyncJson(AsyncJsonValueStore),
}

impl BuiltStore {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            BuiltStore::Bytes(_) => "bytes",
            BuiltStore::Text(_) => "text",
            BuiltStore::Json(_) => "json",
            BuiltStore::Stream(_) => "stream",
            BuiltStore::Guarded(_) => "guarded",
            BuiltStore::AsyncBytes(_) => "async bytes",
            BuiltStore::AsyncText(_) => "async text",
            BuiltStore::AsyncJson(_) => "async json",
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(
            self,
            BuiltStore::AsyncBytes(_) | BuiltStore::AsyncText(_) | BuiltStore::AsyncJson(_)
        )
    }

    fn mismatch(&self, store: &str, expected: &'static str) -> ConfigError {
        ConfigError::TypeMismatch {
            store: store.to_string(),
            expected,
            found: self.kind(),
        }
    }

    /// The byte store, or [`ConfigError::TypeMismatch`] naming `store`.
    pub fn into_bytes(self, store: &str) -> ConfigResult<DynStore> {
        match self {
            BuiltStore::Bytes(s) => Ok(s),
            other => Err(other.mismatch(store, "bytes")),
        }
    }

    pub fn into_async_bytes(self, store: &str) -> ConfigResult<DynAsyncStore> {
        match self {
            BuiltStore::AsyncBytes(s) => Ok(s),
            other => Err(other.mismatch(store, "async bytes")),
        }
    }

    pub fn into_text(self, store: &str) -> ConfigResult<TextStore> {
        match self {
            BuiltStore::Text(s) => Ok(s),
            other => Err(other.mismatch(store, "text")),
        }
    }

    pub fn into_json(self, store: &str) -> ConfigResult<JsonValueStore> {
        match self {
            BuiltStore::Json(s) => Ok(s),
            other => Err(other.mismatch(store, "json")),
        }
    }

    pub fn into_stream(self, store: &str) -> ConfigResult<StreamStore> {
        match self {
            BuiltStore::Stream(s) => Ok(s),
            other => Err(other.mismatch(store, "stream")),
        }
    }

    pub fn into_guarded(self, store: &str) -> ConfigResult<GuardedStore> {
        match self {
            BuiltStore::Guarded(s) => Ok(s),
            other => Err(other.mismatch(store, "guarded")),
        }
    }

    pub fn into_async_text(self, store: &str) -> ConfigResult<AsyncTextStore> {
        match self {
            BuiltStore::AsyncText(s) => Ok(s),
            other => Err(other.mismatch(store, "async text")),
        }
    }

    pub fn into_async_json(self, store: &str) -> ConfigResult<AsyncJsonValueStore> {
        match self {
            BuiltStore::AsyncJson(s) => Ok(s),
            other => Err(other.mismatch(store, "async json")),
        }
    }
}

impl fmt::Debug for BuiltStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BuiltStore").field(&self.kind()).finish()
    }
}
