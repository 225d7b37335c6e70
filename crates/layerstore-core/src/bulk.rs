//! Whole-store operations built only on the store contract.

use std::collections::HashSet;

use futures::{StreamExt, TryStreamExt};
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::{AsyncObjectStore, ObjectStore};

/// What a bulk operation did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Keys written to the target.
    pub copied: usize,
    /// Keys left alone because the target already had them.
    pub skipped: usize,
    /// Keys deleted.
    pub deleted: usize,
}

/// Copy every key of `from` into `to`.
///
/// With `overwrite` false, keys already present in `to` are skipped.
pub fn copy_store<F, T>(from: &F, to: &T, overwrite: bool) -> StoreResult<BulkReport>
where
    F: ObjectStore + ?Sized,
    T: ObjectStore<Value = F::Value> + ?Sized,
{
    let mut report = BulkReport::default();
    for key in from.keys()? {
        let key = key?;
        if overwrite || !to.exists(&key)? {
            to.put(&key, from.get(&key)?)?;
            report.copied += 1;
        } else {
            report.skipped += 1;
        }
    }
    debug!(copied = report.copied, skipped = report.skipped, "copied store");
    Ok(report)
}

/// Delete every key of `store`.
///
/// The key list is collected before the first delete, so backends whose
/// listing is invalidated by mutation are safe.
pub fn clear_store<S: ObjectStore + ?Sized>(store: &S) -> StoreResult<BulkReport> {
    let keys = store.keys()?.collect::<StoreResult<Vec<_>>>()?;
    for key in &keys {
        store.delete(key)?;
    }
    let report = BulkReport {
        deleted: keys.len(),
        ..BulkReport::default()
    };
    debug!(deleted = report.deleted, "cleared store");
    Ok(report)
}

/// Copy keys missing from `to`, and with `delete` remove keys `from` lacks.
///
/// Keys present on both sides are not compared or rewritten.
pub fn sync_stores<F, T>(from: &F, to: &T, delete: bool) -> StoreResult<BulkReport>
where
    F: ObjectStore + ?Sized,
    T: ObjectStore<Value = F::Value> + ?Sized,
{
    let source = from.keys()?.collect::<StoreResult<HashSet<_>>>()?;
    let target = to.keys()?.collect::<StoreResult<HashSet<_>>>()?;
    let mut report = BulkReport::default();
    for key in source.difference(&target) {
        to.put(key, from.get(key)?)?;
        report.copied += 1;
    }
    report.skipped = source.len() - report.copied;
    if delete {
        for key in target.difference(&source) {
            to.delete(key)?;
            report.deleted += 1;
        }
    }
    debug!(
        copied = report.copied,
        skipped = report.skipped,
        deleted = report.deleted,
        "synced stores"
    );
    Ok(report)
}

/// Async [`copy_store`]; streams the source listing.
pub async fn copy_store_async<F, T>(from: &F, to: &T, overwrite: bool) -> StoreResult<BulkReport>
where
    F: AsyncObjectStore + ?Sized,
    T: AsyncObjectStore<Value = F::Value> + ?Sized,
{
    let mut report = BulkReport::default();
    let mut keys = from.keys().await?;
    while let Some(key) = keys.next().await {
        let key = key?;
        if overwrite || !to.exists(&key).await? {
            to.put(&key, from.get(&key).await?).await?;
            report.copied += 1;
        } else {
            report.skipped += 1;
        }
    }
    debug!(copied = report.copied, skipped = report.skipped, "copied store");
    Ok(report)
}

/// Async [`clear_store`].
pub async fn clear_store_async<S: AsyncObjectStore + ?Sized>(store: &S) -> StoreResult<BulkReport> {
    let keys: Vec<String> = store.keys().await?.try_collect().await?;
    for key in &keys {
        store.delete(key).await?;
    }
    let report = BulkReport {
        deleted: keys.len(),
        ..BulkReport::default()
    };
    debug!(deleted = report.deleted, "cleared store");
    Ok(report)
}

/// Async [`sync_stores`].
///
/// Probes the other side with `exists` instead of materializing both key
/// sets. The target's listing is collected before deleting from it.
pub async fn sync_stores_async<F, T>(from: &F, to: &T, delete: bool) -> StoreResult<BulkReport>
where
    F: AsyncObjectStore + ?Sized,
    T: AsyncObjectStore<Value = F::Value> + ?Sized,
{
    let mut report = BulkReport::default();
    let mut keys = from.keys().await?;
    while let Some(key) = keys.next().await {
        let key = key?;
        if to.exists(&key).await? {
            report.skipped += 1;
        } else {
            to.put(&key, from.get(&key).await?).await?;
            report.copied += 1;
        }
    }
    drop(keys);
    if delete {
        let target: Vec<String> = to.keys().await?.try_collect().await?;
        for key in target {
            if !from.exists(&key).await? {
                to.delete(&key).await?;
                report.deleted += 1;
            }
        }
    }
    debug!(
        copied = report.copied,
        skipped = report.skipped,
        deleted = report.deleted,
        "synced stores"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{AsyncDictStore, DictStore};

    fn sorted_keys(store: &DictStore) -> Vec<String> {
        ObjectStore::keys(store)
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    #[test]
    fn copy_overwrites_by_default() {
        let from = DictStore::with_objects([("a", b"new".to_vec()), ("b", b"2".to_vec())]);
        let to = DictStore::with_objects([("a", b"old".to_vec())]);
        let report = copy_store(&from, &to, true).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(ObjectStore::get(&to, "a").unwrap(), b"new");
    }

    #[test]
    fn copy_without_overwrite_skips_existing() {
        let from = DictStore::with_objects([("a", b"new".to_vec()), ("b", b"2".to_vec())]);
        let to = DictStore::with_objects([("a", b"old".to_vec())]);
        let report = copy_store(&from, &to, false).unwrap();
        assert_eq!(report, BulkReport { copied: 1, skipped: 1, deleted: 0 });
        assert_eq!(ObjectStore::get(&to, "a").unwrap(), b"old");
        assert_eq!(ObjectStore::get(&to, "b").unwrap(), b"2");
    }

    #[test]
    fn clear_deletes_everything() {
        let store = DictStore::with_objects([("a", Vec::new()), ("b", Vec::new())]);
        assert_eq!(clear_store(&store).unwrap().deleted, 2);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn sync_with_delete_matches_source_key_set() {
        let from = DictStore::with_objects([("a", b"1".to_vec()), ("b", b"2".to_vec())]);
        let to = DictStore::with_objects([("b", b"x".to_vec()), ("c", b"3".to_vec())]);
        let report = sync_stores(&from, &to, true).unwrap();
        assert_eq!(sorted_keys(&to), vec!["a", "b"]);
        assert_eq!(report, BulkReport { copied: 1, skipped: 1, deleted: 1 });
        // Keys on both sides are left as they were.
        assert_eq!(ObjectStore::get(&to, "b").unwrap(), b"x");
    }

    #[test]
    fn sync_without_delete_keeps_extra_keys() {
        let from = DictStore::with_objects([("a", Vec::new())]);
        let to = DictStore::with_objects([("c", Vec::new())]);
        sync_stores(&from, &to, false).unwrap();
        assert_eq!(sorted_keys(&to), vec!["a", "c"]);
    }

    #[test]
    fn works_through_trait_objects() {
        use crate::traits::DynStore;
        use std::sync::Arc;

        let from: DynStore = Arc::new(DictStore::with_objects([("k", b"v".to_vec())]));
        let to: DynStore = Arc::new(DictStore::new());
        copy_store(&*from, &*to, true).unwrap();
        assert_eq!(ObjectStore::get(&*to, "k").unwrap(), b"v");
    }

    // -----------------------------------------------------------------------
    // Async
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn async_copy_clear_and_sync() {
        let from = AsyncDictStore::with_objects([("a", b"1".to_vec()), ("b", b"2".to_vec())]);
        let to = AsyncDictStore::with_objects([("b", b"x".to_vec()), ("c", b"3".to_vec())]);

        let report = sync_stores_async(&from, &to, true).await.unwrap();
        assert_eq!(report, BulkReport { copied: 1, skipped: 1, deleted: 1 });
        let keys: Vec<String> = AsyncObjectStore::keys(&to)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(keys, vec!["a", "b"]);

        let report = copy_store_async(&from, &to, false).await.unwrap();
        assert_eq!(report.skipped, 2);
        let report = copy_store_async(&from, &to, true).await.unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(AsyncObjectStore::get(&to, "b").await.unwrap(), b"2");

        assert_eq!(clear_store_async(&to).await.unwrap().deleted, 2);
        assert!(to.is_empty().unwrap());
    }
}
