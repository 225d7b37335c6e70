//! Stackable key/value object stores.
//!
//! This crate defines the store contract shared by every backend and
//! decorator, the reversible transformer strategies decorators are built
//! from, and the decorators themselves. Both a blocking and an async flavor
//! are provided; they compose by the same rules.
//!
//! # Architecture
//!
//! - A **store** implements [`ObjectStore`] (or [`AsyncObjectStore`]):
//!   `get`, `put`, `exists`, `delete`, optional `keys`, and `open`/`close`
//!   for stores that hold an external resource.
//! - A **transformer** is a reversible strategy. [`transform::DataTransformer`]
//!   rewrites payloads, [`transform::KeyTransformer`] rewrites keys.
//! - A **decorator** holds one child store (or several) plus at most one
//!   transformer, and implements the contract in terms of its children.
//!
//! # Modules
//!
//! - [`error`] -- [`StoreError`] and its coarse [`ErrorKind`]
//! - [`traits`] -- the [`ObjectStore`] / [`AsyncObjectStore`] contract
//! - [`memory`] -- [`DictStore`] and [`AsyncDictStore`]
//! - [`scope`] -- scoped acquisition guards and multi-child open/close
//! - [`transform`] -- data and key transformers
//! - [`decorators`] -- blocking decorator stores
//! - [`aio`] -- async decorator stores and the blocking-to-async bridge
//! - [`bulk`] -- copy, clear and sync over the generic contract
//! - `testing` -- test doubles (`testing` feature)

pub mod aio;
pub mod bulk;
pub mod decorators;
pub mod error;
pub mod memory;
pub mod scope;
pub mod traits;
pub mod transform;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bulk::{
    clear_store, clear_store_async, copy_store, copy_store_async, sync_stores, sync_stores_async,
    BulkReport,
};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use memory::{AsyncDictStore, DictStore};
pub use scope::{enter, enter_async, with_async_scope, with_scope, AsyncScope, Scope};
pub use traits::{AsyncObjectStore, DynAsyncStore, DynStore, KeyIter, KeyStream, ObjectStore};
