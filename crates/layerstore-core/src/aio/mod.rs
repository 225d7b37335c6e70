//! The async flavor of the decorator stores.
//!
//! Each type mirrors its sync counterpart in [`crate::decorators`] and shares
//! its transformer strategies. [`BlockingStore`] lifts any sync store into
//! this world.

pub mod bridge;
pub mod cache;
pub mod fanout;
pub mod identity;
pub mod keyed;
pub mod transforming;

pub use bridge::BlockingStore;
pub use cache::AsyncCachingStore;
pub use fanout::AsyncFanoutStore;
pub use identity::{AsyncIdentityStore, AsyncLoggingStore, AsyncReadonlyStore};
pub use keyed::{
    AsyncHashPrefixStore, AsyncKeyTransformingStore, AsyncKeyValidatingStore, AsyncPrefixStore,
    AsyncRegexValidatingStore, AsyncUrlEncodingStore, AsyncUrlValidatingStore,
};
pub use transforming::{
    AsyncBase64Store, AsyncBufferStore, AsyncGzipStore, AsyncJsonStore, AsyncTextEncodingStore,
    AsyncTransformingStore, AsyncZstdStore,
};
