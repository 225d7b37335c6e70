//! Single-table SQLite backend.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use layerstore_core::{KeyIter, ObjectStore, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS objects (key TEXT PRIMARY KEY, data BLOB)";

/// Stores objects as rows of `objects(key TEXT PRIMARY KEY, data BLOB)`.
///
/// The connection is a scoped resource: [`open`](ObjectStore::open) connects
/// and creates the table, [`close`](ObjectStore::close) disconnects. Any
/// operation outside a scope fails with a backend error.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Mutex::new(None),
        }
    }

    /// A private in-memory database; its contents vanish on close.
    pub fn in_memory() -> Self {
        Self::new(":memory:")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> StoreResult<bool> {
        Ok(self.conn.lock()?.is_some())
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StoreResult<T> {
        let guard = self.conn.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| StoreError::backend("store is not open"))?;
        f(conn).map_err(StoreError::backend)
    }
}

impl ObjectStore for SqliteStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT data FROM objects WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()
        })?
        .ok_or_else(|| StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO objects (key, data) VALUES (?1, ?2)",
                params![key, value],
            )
        })?;
        Ok(())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        let row = self.with_conn(|conn| {
            conn.query_row("SELECT 1 FROM objects WHERE key = ?1", params![key], |_| Ok(()))
                .optional()
        })?;
        Ok(row.is_some())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let deleted =
            self.with_conn(|conn| conn.execute("DELETE FROM objects WHERE key = ?1", params![key]))?;
        if deleted == 0 {
            return Err(StoreError::not_found(key));
        }
        Ok(())
    }

    /// Sorted snapshot taken under the connection lock.
    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        let keys = self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM objects ORDER BY key")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(Box::new(keys.into_iter().map(Ok)))
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreResult<KeyIter<'a>> {
        let keys = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM objects WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(Box::new(keys.into_iter().map(Ok)))
    }

    fn open(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock()?;
        if guard.is_some() {
            return Ok(());
        }
        let conn = Connection::open(&self.path).map_err(StoreError::backend)?;
        conn.execute(CREATE_TABLE, []).map_err(StoreError::backend)?;
        debug!(path = %self.path.display(), "opened sqlite store");
        *guard = Some(conn);
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let conn = self.conn.lock()?.take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, err)| StoreError::backend(err))?;
            debug!(path = %self.path.display(), "closed sqlite store");
        }
        Ok(())
    }
}
