//! Zip archive backend.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use layerstore_core::{KeyIter, ObjectStore, StoreError, StoreResult};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// A partial store over a zip file.
///
/// [`open`](ObjectStore::open) reads the archive (a missing file is an empty
/// archive); entries added while open are appended on
/// [`close`](ObjectStore::close). Entries are immutable: writing an existing
/// name is rejected and deletion is not supported.
#[derive(Debug)]
pub struct ZipStore {
    path: PathBuf,
    state: Mutex<Option<OpenArchive>>,
}

#[derive(Debug, Default)]
struct OpenArchive {
    entries: BTreeMap<String, Vec<u8>>,
    added: Vec<String>,
}

impl ZipStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_archive<T>(&self, f: impl FnOnce(&mut OpenArchive) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.state.lock()?;
        let archive = guard
            .as_mut()
            .ok_or_else(|| StoreError::backend("store is not open"))?;
        f(archive)
    }

    fn read_archive(&self) -> StoreResult<OpenArchive> {
        if !self.path.exists() {
            return Ok(OpenArchive::default());
        }
        let mut zip = ZipArchive::new(File::open(&self.path)?).map_err(StoreError::backend)?;
        let mut entries = BTreeMap::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index).map_err(StoreError::backend)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.insert(entry.name().to_string(), data);
        }
        Ok(OpenArchive {
            entries,
            added: Vec::new(),
        })
    }

    fn write_added(&self, archive: &OpenArchive) -> StoreResult<()> {
        if archive.added.is_empty() {
            return Ok(());
        }
        let mut writer = if self.path.exists() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            ZipWriter::new_append(file).map_err(StoreError::backend)?
        } else {
            ZipWriter::new(File::create(&self.path)?)
        };
        for name in &archive.added {
            let data = archive
                .entries
                .get(name)
                .ok_or_else(|| StoreError::backend(format!("lost zip entry {name}")))?;
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .map_err(StoreError::backend)?;
            writer.write_all(data)?;
        }
        writer.finish().map_err(StoreError::backend)?;
        debug!(path = %self.path.display(), added = archive.added.len(), "wrote zip entries");
        Ok(())
    }
}

impl ObjectStore for ZipStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.with_archive(|archive| {
            archive
                .entries
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::not_found(key))
        })
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.with_archive(|archive| {
            if archive.entries.contains_key(key) {
                return Err(StoreError::key_rejected(key, "zip entry already exists"));
            }
            archive.entries.insert(key.to_string(), value);
            archive.added.push(key.to_string());
            Ok(())
        })
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.with_archive(|archive| Ok(archive.entries.contains_key(key)))
    }

    fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::not_supported("zip store", "delete"))
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        let names: Vec<String> =
            self.with_archive(|archive| Ok(archive.entries.keys().cloned().collect()))?;
        Ok(Box::new(names.into_iter().map(Ok)))
    }

    fn open(&self) -> StoreResult<()> {
        let mut guard = self.state.lock()?;
        if guard.is_none() {
            *guard = Some(self.read_archive()?);
            debug!(path = %self.path.display(), "opened zip store");
        }
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let archive = self.state.lock()?.take();
        match archive {
            Some(archive) => self.write_added(&archive),
            None => Ok(()),
        }
    }
}
