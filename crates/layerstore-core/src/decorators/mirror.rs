use std::collections::HashSet;

use crate::error::{StoreError, StoreResult};
use crate::scope::{close_all, open_all, Resource};
use crate::traits::{KeyIter, ObjectStore};

/// Replicates writes across an ordered list of children.
///
/// Reads are served by the first child (in list order) that has the key.
/// `put` writes to every child in order and stops at the first failure;
/// children written before the failure keep the new value.
#[derive(Debug)]
pub struct MirroringStore<S> {
    children: Vec<S>,
}

impl<S> MirroringStore<S> {
    pub fn new(children: Vec<S>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[S] {
        &self.children
    }

    fn resources(&self) -> Vec<&dyn Resource>
    where
        S: ObjectStore,
    {
        self.children.iter().map(|c| c as &dyn Resource).collect()
    }
}

impl<S> ObjectStore for MirroringStore<S>
where
    S: ObjectStore,
    S::Value: Clone,
{
    type Value = S::Value;

    fn get(&self, key: &str) -> StoreResult<S::Value> {
        for child in &self.children {
            if child.exists(key)? {
                return child.get(key);
            }
        }
        Err(StoreError::not_found(key))
    }

    fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        if let Some((last, rest)) = self.children.split_last() {
            for child in rest {
                child.put(key, value.clone())?;
            }
            last.put(key, value)?;
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        for child in &self.children {
            if child.exists(key)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut found = false;
        for child in &self.children {
            if child.exists(key)? {
                child.delete(key)?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(StoreError::not_found(key))
        }
    }

    /// Deduplicated union of every child's keys, in first-seen order.
    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        let listings = self
            .children
            .iter()
            .map(|child| child.keys())
            .collect::<StoreResult<Vec<_>>>()?;
        let mut seen = HashSet::new();
        Ok(Box::new(listings.into_iter().flatten().filter(
            move |item| match item {
                Ok(key) => seen.insert(key.clone()),
                Err(_) => true,
            },
        )))
    }

    fn open(&self) -> StoreResult<()> {
        open_all(&self.resources())
    }

    fn close(&self) -> StoreResult<()> {
        close_all(&self.resources())
    }
}
