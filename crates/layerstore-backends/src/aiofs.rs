//! Async filesystem backends on `tokio::fs`.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use layerstore_core::aio::AsyncKeyTransformingStore;
use layerstore_core::transform::FilesystemSafeKeyTransformer;
use layerstore_core::{AsyncObjectStore, KeyStream, StoreError, StoreResult};
use tokio::fs;
use tracing::debug;

use crate::fs::{hashpath, key_path, relative_key};

/// Async [`FilesystemStore`](crate::fs::FilesystemStore).
///
/// Listing walks the tree lazily, one directory read at a time; order is
/// whatever the filesystem returns.
#[derive(Clone, Debug)]
pub struct AsyncFilesystemStore {
    root: PathBuf,
}

impl AsyncFilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AsyncObjectStore for AsyncFilesystemStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        read_file(&key_path(&self.root, key)?, key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        write_file(&key_path(&self.root, key)?, &value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        file_exists(&key_path(&self.root, key)?).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        remove_file(&key_path(&self.root, key)?, key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        Ok(walk(self.root.clone()).boxed())
    }
}

/// Depth-first listing of every regular file under `root`.
fn walk(root: PathBuf) -> impl Stream<Item = StoreResult<String>> + Send {
    async_stream::try_stream! {
        let mut pending = vec![root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => Err(err)?,
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    yield relative_key(&root, &entry.path())?;
                }
            }
        }
    }
}

/// Async [`HashdirStore`](crate::fs::HashdirStore) with the default
/// 2x3 layout.
#[derive(Clone, Debug)]
pub struct AsyncHashdirStore {
    root: PathBuf,
    width: usize,
    depth: usize,
}

impl AsyncHashdirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            width: 2,
            depth: 3,
        }
    }

    pub fn with_layout(root: impl Into<PathBuf>, width: usize, depth: usize) -> StoreResult<Self> {
        if width == 0 || width * depth >= 64 {
            return Err(StoreError::Configuration(format!(
                "hashdir layout {width}x{depth} does not fit a 64 character digest"
            )));
        }
        Ok(Self {
            root: root.into(),
            width,
            depth,
        })
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(hashpath(key, self.width, self.depth))
    }
}

#[async_trait]
impl AsyncObjectStore for AsyncHashdirStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        read_file(&self.path(key), key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        write_file(&self.path(key), &value).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        file_exists(&self.path(key)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        remove_file(&self.path(key), key).await
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        Err(StoreError::not_supported("hashdir store", "keys"))
    }
}

pub type AsyncSafeFilesystemStore =
    AsyncKeyTransformingStore<AsyncFilesystemStore, FilesystemSafeKeyTransformer>;

/// Async [`safe_filesystem_store`](crate::fs::safe_filesystem_store).
pub fn async_safe_filesystem_store(root: impl Into<PathBuf>) -> AsyncSafeFilesystemStore {
    AsyncKeyTransformingStore::new(AsyncFilesystemStore::new(root), FilesystemSafeKeyTransformer)
}

async fn read_file(path: &Path, key: &str) -> StoreResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(data) => Ok(data),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(key)),
        Err(err) => Err(err.into()),
    }
}

async fn write_file(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, data).await?;
    debug!(path = %path.display(), len = data.len(), "wrote object");
    Ok(())
}

async fn file_exists(path: &Path) -> StoreResult<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

async fn remove_file(path: &Path, key: &str) -> StoreResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(key)),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use layerstore_core::ErrorKind;

    async fn sorted_keys<S: AsyncObjectStore>(store: &S) -> Vec<String> {
        let mut keys: Vec<String> = store.keys().await.unwrap().try_collect().await.unwrap();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn crud_and_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncFilesystemStore::new(dir.path());

        store.put("x/y/z", b"1".to_vec()).await.unwrap();
        store.put("top", b"2".to_vec()).await.unwrap();
        assert_eq!(store.get("x/y/z").await.unwrap(), b"1");
        assert!(store.exists("top").await.unwrap());
        assert_eq!(sorted_keys(&store).await, vec!["top", "x/y/z"]);

        store.delete("top").await.unwrap();
        assert!(!store.exists("top").await.unwrap());
        assert!(store.get("top").await.unwrap_err().is_not_found());
        assert!(store.delete("top").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncFilesystemStore::new(dir.path().join("absent"));
        assert!(sorted_keys(&store).await.is_empty());
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncFilesystemStore::new(dir.path());
        let err = store.put("../evil", Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyRejected);
    }

    #[tokio::test]
    async fn hashdir_matches_sync_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = AsyncHashdirStore::new(dir.path());
        store.put("hello", b"world".to_vec()).await.unwrap();

        let sync = crate::fs::HashdirStore::new(dir.path());
        assert_eq!(store.path("hello"), sync.path("hello"));
        assert!(sync.path("hello").is_file());
        assert_eq!(store.get("hello").await.unwrap(), b"world");
        assert_eq!(
            store.keys().await.err().unwrap().kind(),
            ErrorKind::NotSupported
        );
    }

    #[tokio::test]
    async fn safe_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = async_safe_filesystem_store(dir.path());
        store.put("a/b c", b"1".to_vec()).await.unwrap();
        store.put("ünïcode", b"2".to_vec()).await.unwrap();
        assert_eq!(store.get("a/b c").await.unwrap(), b"1");
        assert_eq!(sorted_keys(&store).await, vec!["a/b c", "ünïcode"]);
    }
}
