//! Stackable stores that wrap other stores.
//!
//! Every decorator holds its child (or children) by value and implements
//! [`ObjectStore`](crate::ObjectStore) in terms of the child's contract, so
//! any backend or decorator can sit underneath any other. Use `Arc<S>` as
//! the child type to share a store between several stacks.

pub mod cache;
pub mod identity;
pub mod keyed;
pub mod logging;
pub mod mirror;
pub mod notify;
pub mod transforming;

pub use cache::CachingStore;
pub use identity::{IdentityStore, ReadonlyStore, WriteonlyStore};
pub use keyed::{
    FilesystemSafeStore, HashPrefixStore, KeyTransformingStore, KeyValidatingStore, PrefixStore,
    RegexValidatingStore, UrlEncodingStore, UrlValidatingStore,
};
pub use logging::{ExceptionLoggingStore, LoggingStore};
pub use mirror::MirroringStore;
pub use notify::{ChangeHandler, ChangeKind, NotifyingStore};
pub use transforming::{
    Base64Store, BufferStore, GzipStore, JsonStore, TextEncodingStore, TransformingStore,
    ZstdStore,
};
