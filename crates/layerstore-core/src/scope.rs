//! Scoped acquisition of store resources.
//!
//! Resource-holding stores (database connections, archive handles, HTTP
//! sessions) are opened once, serve any number of operations, and are closed
//! exactly once on every exit path. The guards here pair the two calls:
//!
//! - [`enter`] returns a [`Scope`] whose `Drop` closes the store.
//! - [`enter_async`] returns an [`AsyncScope`]; [`AsyncScope::exit`] closes it,
//!   and a guard dropped without exit (cancellation, panic) spawns the close
//!   onto the current runtime.
//! - [`open_all`]/[`close_all`] (and their async twins) are what multi-child
//!   decorators use to enter every child in a fixed order and unwind the
//!   already-entered ones when a later child fails, or, in the async flavor,
//!   when the open is cancelled part-way.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreResult;
use crate::traits::{AsyncObjectStore, ObjectStore};

// ---------------------------------------------------------------------------
// Object-safe resource views
// ---------------------------------------------------------------------------

/// Object-safe view of a store's open/close pair.
///
/// Lets decorators with heterogeneous children (a cache pair of two
/// different store types) hand them to [`open_all`] as one slice.
pub trait Resource {
    fn acquire(&self) -> StoreResult<()>;
    fn release(&self) -> StoreResult<()>;
}

impl<S: ObjectStore + ?Sized> Resource for S {
    fn acquire(&self) -> StoreResult<()> {
        ObjectStore::open(self)
    }

    fn release(&self) -> StoreResult<()> {
        ObjectStore::close(self)
    }
}

/// Async counterpart of [`Resource`].
#[async_trait]
pub trait AsyncResource: Send + Sync {
    async fn acquire(&self) -> StoreResult<()>;
    async fn release(&self) -> StoreResult<()>;
}

#[async_trait]
impl<S: AsyncObjectStore + ?Sized> AsyncResource for S {
    async fn acquire(&self) -> StoreResult<()> {
        AsyncObjectStore::open(self).await
    }

    async fn release(&self) -> StoreResult<()> {
        AsyncObjectStore::close(self).await
    }
}

// ---------------------------------------------------------------------------
// Multi-child open/close
// ---------------------------------------------------------------------------

/// Open every resource in order.
///
/// If opening child `i` fails, children `0..i` are closed in reverse order
/// before the original error is returned. Close failures during the unwind
/// are logged, not returned.
pub fn open_all(resources: &[&dyn Resource]) -> StoreResult<()> {
    for (index, resource) in resources.iter().enumerate() {
        if let Err(err) = resource.acquire() {
            for opened in resources[..index].iter().rev() {
                if let Err(close_err) = opened.release() {
                    warn!(error = %close_err, "failed to close child while unwinding a partial open");
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Close every resource in reverse order.
///
/// Every child is attempted even if an earlier close fails; the first error
/// is returned.
pub fn close_all(resources: &[&dyn Resource]) -> StoreResult<()> {
    let mut first_err = None;
    for resource in resources.iter().rev() {
        if let Err(err) = resource.release() {
            warn!(error = %err, "failed to close child store");
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Async version of [`open_all`].
///
/// Children are taken as owned handles so that the ones already opened can
/// still be closed if the returned future is dropped before it completes
/// (the caller was cancelled while a later child was opening). In that case
/// their close is spawned onto the current tokio runtime, in reverse order.
pub async fn open_all_async(resources: &[Arc<dyn AsyncResource>]) -> StoreResult<()> {
    let mut partial = PartialOpen {
        opened: Vec::with_capacity(resources.len()),
    };
    for resource in resources {
        if let Err(err) = resource.acquire().await {
            while let Some(opened) = partial.opened.pop() {
                if let Err(close_err) = opened.release().await {
                    warn!(error = %close_err, "failed to close child while unwinding a partial open");
                }
            }
            return Err(err);
        }
        partial.opened.push(Arc::clone(resource));
    }
    partial.opened.clear();
    Ok(())
}

/// Async version of [`close_all`].
pub async fn close_all_async(resources: &[Arc<dyn AsyncResource>]) -> StoreResult<()> {
    let mut first_err = None;
    for resource in resources.iter().rev() {
        if let Err(err) = resource.release().await {
            warn!(error = %err, "failed to close child store");
            first_err.get_or_insert(err);
        }
    }
    first_err.map_or(Ok(()), Err)
}

/// Children opened so far by an in-progress [`open_all_async`].
struct PartialOpen {
    opened: Vec<Arc<dyn AsyncResource>>,
}

impl Drop for PartialOpen {
    fn drop(&mut self) {
        if self.opened.is_empty() {
            return;
        }
        let opened = std::mem::take(&mut self.opened);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for resource in opened.into_iter().rev() {
                        if let Err(err) = resource.release().await {
                            warn!(error = %err, "failed to close child after abandoned open");
                        }
                    }
                });
            }
            Err(_) => warn!(
                count = opened.len(),
                "partial open dropped outside a runtime; children left open"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync guard
// ---------------------------------------------------------------------------

/// An open store. Closing happens when the guard is dropped or
/// [`exit`](Scope::exit)ed.
pub struct Scope<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    open: bool,
}

/// Open `store` and return a guard that closes it.
pub fn enter<S: ObjectStore + ?Sized>(store: &S) -> StoreResult<Scope<'_, S>> {
    ObjectStore::open(store)?;
    Ok(Scope { store, open: true })
}

/// Run `f` against an open `store`, closing it afterwards.
///
/// An error from `f` takes precedence over an error from closing.
pub fn with_scope<S, T, F>(store: &S, f: F) -> StoreResult<T>
where
    S: ObjectStore + ?Sized,
    F: FnOnce(&S) -> StoreResult<T>,
{
    let scope = enter(store)?;
    let result = f(scope.store);
    let exited = scope.exit();
    let value = result?;
    exited?;
    Ok(value)
}

impl<S: ObjectStore + ?Sized> Scope<'_, S> {
    /// Close the store now and report the close error, if any.
    pub fn exit(mut self) -> StoreResult<()> {
        self.open = false;
        ObjectStore::close(self.store)
    }
}

impl<S: ObjectStore + ?Sized> Deref for Scope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.store
    }
}

impl<S: ObjectStore + ?Sized> Drop for Scope<'_, S> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = ObjectStore::close(self.store) {
                warn!(error = %err, "failed to close store on scope exit");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Async guard
// ---------------------------------------------------------------------------

/// An open async store.
///
/// Prefer [`exit`](AsyncScope::exit). If the guard is dropped while still
/// open (the owning task was cancelled or panicked), the close is spawned on
/// the current tokio runtime so the resource is still released.
pub struct AsyncScope<S: AsyncObjectStore + ?Sized + 'static> {
    store: Arc<S>,
    open: bool,
}

/// Open `store` and return a guard that closes it.
pub async fn enter_async<S>(store: Arc<S>) -> StoreResult<AsyncScope<S>>
where
    S: AsyncObjectStore + ?Sized + 'static,
{
    AsyncObjectStore::open(&*store).await?;
    Ok(AsyncScope { store, open: true })
}

/// Run `f` against an open `store`, closing it afterwards.
///
/// If the returned future is dropped mid-flight the guard's drop path still
/// closes the store.
pub async fn with_async_scope<S, T, F, Fut>(store: Arc<S>, f: F) -> StoreResult<T>
where
    S: AsyncObjectStore + ?Sized + 'static,
    F: FnOnce(Arc<S>) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let scope = enter_async(store).await?;
    let result = f(Arc::clone(&scope.store)).await;
    let exited = scope.exit().await;
    let value = result?;
    exited?;
    Ok(value)
}

impl<S: AsyncObjectStore + ?Sized + 'static> AsyncScope<S> {
    /// The open store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Close the store now and report the close error, if any.
    pub async fn exit(mut self) -> StoreResult<()> {
        self.open = false;
        AsyncObjectStore::close(&*self.store).await
    }
}

impl<S: AsyncObjectStore + ?Sized + 'static> Deref for AsyncScope<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.store
    }
}

impl<S: AsyncObjectStore + ?Sized + 'static> Drop for AsyncScope<S> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = AsyncObjectStore::close(&*store).await {
                        warn!(error = %err, "failed to close store after abandoned scope");
                    }
                });
            }
            Err(_) => warn!("async scope dropped outside a runtime; store left open"),
        }
    }
}
