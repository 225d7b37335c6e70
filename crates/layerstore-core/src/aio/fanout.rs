use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::StreamExt;

use crate::error::{StoreError, StoreResult};
use crate::scope::{close_all_async, open_all_async, AsyncResource};
use crate::traits::{AsyncObjectStore, KeyStream};

/// Async [`MirroringStore`](crate::decorators::MirroringStore).
///
/// Children are visited sequentially in list order, so write ordering and
/// first-child-wins reads match the sync flavor exactly. Children are held
/// behind `Arc` so a cancelled open can still close the ones it reached.
#[derive(Debug)]
pub struct AsyncFanoutStore<S> {
    children: Vec<Arc<S>>,
}

impl<S> AsyncFanoutStore<S> {
    pub fn new(children: Vec<S>) -> Self {
        Self {
            children: children.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn children(&self) -> &[Arc<S>] {
        &self.children
    }

    fn resources(&self) -> Vec<Arc<dyn AsyncResource>>
    where
        S: AsyncObjectStore + 'static,
    {
        self.children
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn AsyncResource>)
            .collect()
    }
}

#[async_trait]
impl<S> AsyncObjectStore for AsyncFanoutStore<S>
where
    S: AsyncObjectStore + 'static,
    S::Value: Clone,
{
    type Value = S::Value;

    async fn get(&self, key: &str) -> StoreResult<S::Value> {
        for child in &self.children {
            if child.exists(key).await? {
                return child.get(key).await;
            }
        }
        Err(StoreError::not_found(key))
    }

    async fn put(&self, key: &str, value: S::Value) -> StoreResult<()> {
        if let Some((last, rest)) = self.children.split_last() {
            for child in rest {
                child.put(key, value.clone()).await?;
            }
            last.put(key, value).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        for child in &self.children {
            if child.exists(key).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut found = false;
        for child in &self.children {
            if child.exists(key).await? {
                child.delete(key).await?;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(StoreError::not_found(key))
        }
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        let mut listings = Vec::with_capacity(self.children.len());
        for child in &self.children {
            listings.push(child.keys().await?);
        }
        let merged = async_stream::stream! {
            let mut seen = HashSet::new();
            for mut listing in listings {
                while let Some(item) = listing.next().await {
                    match item {
                        Ok(key) => {
                            if seen.insert(key.clone()) {
                                yield Ok(key);
                            }
                        }
                        Err(err) => yield Err(err),
                    }
                }
            }
        };
        Ok(merged.boxed())
    }

    async fn open(&self) -> StoreResult<()> {
        open_all_async(&self.resources()).await
    }

    async fn close(&self) -> StoreResult<()> {
        close_all_async(&self.resources()).await
    }
}
