//! Backend adapters for layerstore.
//!
//! Every type here is a terminal store: it implements the
//! [`ObjectStore`](layerstore_core::ObjectStore) or
//! [`AsyncObjectStore`](layerstore_core::AsyncObjectStore) contract over a
//! real storage medium and holds no child stores.
//!
//! # Modules
//!
//! - [`fs`] -- [`FilesystemStore`], [`HashdirStore`], [`safe_filesystem_store`]
//! - [`aiofs`] -- the same on `tokio::fs`
//! - [`sqlite`] -- [`SqliteStore`], one table, scoped connection
//! - [`archive`] -- [`ZipStore`], append-only zip file
//! - [`http`] -- [`HttpStore`] / [`AsyncHttpStore`], GET-only, keys are URLs

pub mod aiofs;
pub mod archive;
pub mod fs;
pub mod http;
pub mod sqlite;

pub use aiofs::{
    async_safe_filesystem_store, AsyncFilesystemStore, AsyncHashdirStore, AsyncSafeFilesystemStore,
};
pub use archive::ZipStore;
pub use fs::{safe_filesystem_store, FilesystemStore, HashdirStore};
pub use http::{AsyncHttpStore, HttpStore};
pub use sqlite::SqliteStore;
