//! Filesystem backends.
//!
//! [`FilesystemStore`] maps `/`-separated keys onto a directory tree under a
//! root. [`HashdirStore`] shards keys by their SHA-256 digest instead, which
//! keeps directories small but makes listing impossible.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use layerstore_core::decorators::FilesystemSafeStore;
use layerstore_core::{KeyIter, ObjectStore, StoreError, StoreResult};
use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

/// Stores each key as a file at `root/<key>`.
///
/// Key components are joined under the root; empty, `.` and `..` components
/// are rejected so a key can never escape the root. Parent directories are
/// created on `put` and left in place on `delete`.
#[derive(Clone, Debug)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of `key`.
    pub fn path(&self, key: &str) -> StoreResult<PathBuf> {
        key_path(&self.root, key)
    }
}

impl ObjectStore for FilesystemStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        read_file(&self.path(key)?, key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        write_file(&self.path(key)?, &value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        file_exists(&self.path(key)?)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        remove_file(&self.path(key)?, key)
    }

    /// Walks the tree under the root in file-name order.
    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        if !self.root.is_dir() {
            return Ok(Box::new(std::iter::empty()));
        }
        let root = self.root.as_path();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();
        Ok(Box::new(walker.filter_map(move |entry| match entry {
            Err(err) => Some(Err(StoreError::backend(err))),
            Ok(entry) if !entry.file_type().is_file() => None,
            Ok(entry) => Some(relative_key(root, entry.path())),
        })))
    }
}

/// Stores each key at a path derived from its SHA-256 digest.
///
/// With the default layout (width 2, depth 3) the key `k` lands at
/// `root/xx/yy/zz/<remaining 58 hex characters>`. Digests cannot be turned
/// back into keys, so `keys` is not supported.
#[derive(Clone, Debug)]
pub struct HashdirStore {
    root: PathBuf,
    width: usize,
    depth: usize,
}

impl HashdirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            width: 2,
            depth: 3,
        }
    }

    /// Custom sharding: `depth` directory levels of `width` hex characters.
    ///
    /// At least one character of the digest must remain for the file name.
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

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `key` relative to the root.
    pub fn relative_path(&self, key: &str) -> PathBuf {
        hashpath(key, self.width, self.depth)
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(self.relative_path(key))
    }
}

impl ObjectStore for HashdirStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        read_file(&self.path(key), key)
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        write_file(&self.path(key), &value)
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        file_exists(&self.path(key))
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        remove_file(&self.path(key), key)
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Err(StoreError::not_supported("hashdir store", "keys"))
    }
}

/// A filesystem store that accepts any key by encoding it into a safe
/// file name first.
pub fn safe_filesystem_store(root: impl Into<PathBuf>) -> FilesystemSafeStore<FilesystemStore> {
    FilesystemSafeStore::wrap(FilesystemStore::new(root))
}

// ---------------------------------------------------------------------------
// Shared helpers (also used by the async backends)
// ---------------------------------------------------------------------------

/// Join `key` under `root`, refusing anything that could leave it.
pub(crate) fn key_path(root: &Path, key: &str) -> StoreResult<PathBuf> {
    if key.is_empty() {
        return Err(StoreError::key_rejected(key, "empty key"));
    }
    let mut path = root.to_path_buf();
    for component in key.split('/') {
        match component {
            "" => return Err(StoreError::key_rejected(key, "empty path component")),
            "." | ".." => return Err(StoreError::key_rejected(key, "relative path component")),
            c if c.contains(['\\', '\0']) => {
                return Err(StoreError::key_rejected(key, "invalid character in path"))
            }
            c => path.push(c),
        }
    }
    Ok(path)
}

pub(crate) fn hashpath(key: &str, width: usize, depth: usize) -> PathBuf {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    let mut path = PathBuf::new();
    for level in 0..depth {
        path.push(&digest[level * width..(level + 1) * width]);
    }
    path.push(&digest[width * depth..]);
    path
}

pub(crate) fn relative_key(root: &Path, path: &Path) -> StoreResult<String> {
    let relative = path.strip_prefix(root).map_err(StoreError::backend)?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                StoreError::backend(format!("non-UTF-8 file name: {}", path.display()))
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(parts.join("/"))
}

fn read_file(path: &Path, key: &str) -> StoreResult<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Ok(data),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(key)),
        Err(err) => Err(err.into()),
    }
}

fn write_file(path: &Path, data: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    debug!(path = %path.display(), len = data.len(), "wrote object");
    Ok(())
}

fn file_exists(path: &Path) -> StoreResult<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}

fn remove_file(path: &Path, key: &str) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed object");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::not_found(key)),
        Err(err) => Err(err.into()),
    }
}
