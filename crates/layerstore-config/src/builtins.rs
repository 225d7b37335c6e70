//! Factories for every backend and decorator shipped with layerstore.
//!
//! Type names and parameter names are the ones configuration documents use,
//! e.g. `FilesystemStore { root_path }` or `HashPrefixStore { hash_length,
//! separator }`. Unknown parameters are rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use layerstore_backends::{
    async_safe_filesystem_store, safe_filesystem_store, AsyncFilesystemStore, AsyncHashdirStore,
    AsyncHttpStore, FilesystemStore, HashdirStore, HttpStore, SqliteStore, ZipStore,
};
use layerstore_core::aio::{
    AsyncBase64Store, AsyncCachingStore, AsyncFanoutStore, AsyncGzipStore, AsyncHashPrefixStore,
    AsyncIdentityStore, AsyncJsonStore, AsyncLoggingStore, AsyncPrefixStore, AsyncReadonlyStore,
    AsyncRegexValidatingStore, AsyncTextEncodingStore, AsyncTransformingStore,
    AsyncUrlEncodingStore, AsyncUrlValidatingStore, AsyncZstdStore, BlockingStore,
};
use layerstore_core::decorators::{
    Base64Store, BufferStore, CachingStore, ExceptionLoggingStore, FilesystemSafeStore,
    GzipStore, HashPrefixStore, IdentityStore, JsonStore, KeyTransformingStore, LoggingStore,
    MirroringStore, NotifyingStore, PrefixStore, ReadonlyStore, RegexValidatingStore,
    TextEncodingStore, TransformingStore, UrlEncodingStore, UrlValidatingStore, WriteonlyStore,
    ZstdStore,
};
use layerstore_core::transform::{
    Base64Transformer, BufferTransformer, GzipTransformer, HashAlgorithm,
    HashPrefixKeyTransformer, IdentityKeyTransformer, IdentityTransformer, JsonTransformer,
    TextEncodingTransformer, ZstdTransformer,
};
use layerstore_core::{AsyncDictStore, AsyncObjectStore, DictStore, ObjectStore};
use serde::Deserialize;
use serde_json::Value;

use crate::built::BuiltStore;
use crate::error::ConfigResult;
use crate::registry::{BuildRequest, StoreRegistry, StoreType};

const CACHE_ROLES: [&str; 2] = ["main_store", "cache_store"];

fn bytes<S>(store: S) -> BuiltStore
where
    S: ObjectStore<Value = Vec<u8>> + 'static,
{
    BuiltStore::Bytes(Arc::new(store))
}

fn async_bytes<S>(store: S) -> BuiltStore
where
    S: AsyncObjectStore<Value = Vec<u8>> + 'static,
{
    BuiltStore::AsyncBytes(Arc::new(store))
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DictParams {
    #[serde(default)]
    objects: BTreeMap<String, Value>,
}

impl DictParams {
    /// String values are stored as their UTF-8 bytes, anything else as JSON.
    fn into_objects(self, req: &BuildRequest) -> ConfigResult<Vec<(String, Vec<u8>)>> {
        self.objects
            .into_iter()
            .map(|(key, value)| {
                let data = match value {
                    Value::String(text) => text.into_bytes(),
                    other => serde_json::to_vec(&other).map_err(|e| req.invalid(e))?,
                };
                Ok((key, data))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RootParams {
    root_path: PathBuf,
}

fn default_width() -> usize {
    2
}

fn default_depth() -> usize {
    3
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HashdirParams {
    root_path: PathBuf,
    #[serde(default = "default_width")]
    width: usize,
    #[serde(default = "default_depth")]
    depth: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SqliteParams {
    db_path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZipParams {
    path: PathBuf,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpParams {
    #[serde(default = "yes")]
    follow_redirects: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingParams {
    store_name: Option<String>,
}

impl LoggingParams {
    fn name_or(self, req: &BuildRequest) -> String {
        self.store_name.unwrap_or_else(|| req.name.clone())
    }
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TextParams {
    #[serde(default = "default_encoding")]
    encoding: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct GzipParams {
    level: Option<u32>,
    offload: Option<bool>,
}

impl GzipParams {
    fn transformer(&self) -> ConfigResult<GzipTransformer> {
        Ok(match self.level {
            Some(level) => GzipTransformer::with_level(level)?,
            None => GzipTransformer::default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ZstdParams {
    level: Option<i32>,
    offload: Option<bool>,
}

impl ZstdParams {
    fn transformer(&self) -> ConfigResult<ZstdTransformer> {
        Ok(match self.level {
            Some(level) => ZstdTransformer::with_level(level)?,
            None => ZstdTransformer::default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PrefixParams {
    prefix: String,
}

fn default_hash_length() -> usize {
    8
}

fn default_separator() -> String {
    "/".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HashPrefixParams {
    #[serde(default = "default_hash_length")]
    hash_length: usize,
    #[serde(default = "default_separator")]
    separator: String,
    algorithm: Option<String>,
    #[serde(default)]
    verify: bool,
}

impl HashPrefixParams {
    fn transformer(self) -> ConfigResult<HashPrefixKeyTransformer> {
        let mut transformer = HashPrefixKeyTransformer::new(self.hash_length, self.separator)?;
        if let Some(name) = self.algorithm {
            transformer = transformer.with_algorithm(HashAlgorithm::from_name(&name)?);
        }
        Ok(transformer.verifying(self.verify))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternParams {
    pattern: String,
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Add every built-in type to `registry`.
pub(crate) fn register_builtins(registry: &mut StoreRegistry) {
    register_backends(registry);
    register_decorators(registry);
    register_async_backends(registry);
    register_async_decorators(registry);
}

fn register_backends(registry: &mut StoreRegistry) {
    registry.register(
        "DictStore",
        StoreType::leaf(|req| {
            let objects = req.params::<DictParams>()?.into_objects(&req)?;
            Ok(bytes(DictStore::with_objects(objects)))
        }),
    );
    registry.register(
        "FilesystemStore",
        StoreType::leaf(|req| {
            let params: RootParams = req.params()?;
            Ok(bytes(FilesystemStore::new(params.root_path)))
        }),
    );
    registry.register(
        "SafeFilesystemStore",
        StoreType::leaf(|req| {
            let params: RootParams = req.params()?;
            Ok(bytes(safe_filesystem_store(params.root_path)))
        }),
    );
    registry.register(
        "HashdirStore",
        StoreType::leaf(|req| {
            let params: HashdirParams = req.params()?;
            let store = HashdirStore::with_layout(params.root_path, params.width, params.depth)?;
            Ok(bytes(store))
        }),
    );
    registry.register(
        "SqliteStore",
        StoreType::leaf(|req| {
            let params: SqliteParams = req.params()?;
            Ok(bytes(SqliteStore::new(params.db_path)))
        }),
    );
    registry.register(
        "ZipStore",
        StoreType::leaf(|req| {
            let params: ZipParams = req.params()?;
            Ok(bytes(ZipStore::new(params.path)))
        }),
    );
    registry.register(
        "HttpStore",
        StoreType::leaf(|req| {
            let params: HttpParams = req.params()?;
            Ok(bytes(HttpStore::with_redirects(params.follow_redirects)?))
        }),
    );
}

fn register_decorators(registry: &mut StoreRegistry) {
    registry.register(
        "IdentityStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(IdentityStore::new(req.base_bytes()?)))
        }),
    );
    registry.register(
        "ReadonlyStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(ReadonlyStore::new(req.base_bytes()?)))
        }),
    );
    registry.register(
        "WriteonlyStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(WriteonlyStore::new(req.base_bytes()?)))
        }),
    );
    registry.register(
        "LoggingStore",
        StoreType::single(|mut req| {
            let name = req.params::<LoggingParams>()?.name_or(&req);
            Ok(bytes(LoggingStore::with_name(req.base_bytes()?, name)))
        }),
    );
    registry.register(
        "ExceptionLoggingStore",
        StoreType::single(|mut req| {
            let name = req.params::<LoggingParams>()?.name_or(&req);
            let store = ExceptionLoggingStore::with_name(req.base_bytes()?, name);
            Ok(BuiltStore::Guarded(Arc::new(store)))
        }),
    );
    registry.register(
        "NotifyingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(NotifyingStore::new(req.base_bytes()?)))
        }),
    );
    registry.register(
        "TransformingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(TransformingStore::new(req.base_bytes()?, IdentityTransformer)))
        }),
    );
    registry.register(
        "TextEncodingStore",
        StoreType::single(|mut req| {
            let params: TextParams = req.params()?;
            let transformer = TextEncodingTransformer::from_label(&params.encoding)?;
            let store = TextEncodingStore::new(req.base_bytes()?, transformer);
            Ok(BuiltStore::Text(Arc::new(store)))
        }),
    );
    registry.register(
        "GzipStore",
        StoreType::single(|mut req| {
            let params: GzipParams = req.params()?;
            Ok(bytes(GzipStore::new(req.base_bytes()?, params.transformer()?)))
        }),
    );
    registry.register(
        "ZstdStore",
        StoreType::single(|mut req| {
            let params: ZstdParams = req.params()?;
            Ok(bytes(ZstdStore::new(req.base_bytes()?, params.transformer()?)))
        }),
    );
    registry.register(
        "BufferStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            let store = BufferStore::new(req.base_bytes()?, BufferTransformer);
            Ok(BuiltStore::Stream(Arc::new(store)))
        }),
    );
    registry.register(
        "Base64Store",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(Base64Store::new(req.base_bytes()?, Base64Transformer)))
        }),
    );
    registry.register(
        "JsonStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            let store = JsonStore::new(req.base_bytes()?, JsonTransformer);
            Ok(BuiltStore::Json(Arc::new(store)))
        }),
    );
    registry.register(
        "KeyTransformingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(KeyTransformingStore::new(
                req.base_bytes()?,
                IdentityKeyTransformer,
            )))
        }),
    );
    registry.register(
        "PrefixStore",
        StoreType::single(|mut req| {
            let params: PrefixParams = req.params()?;
            Ok(bytes(PrefixStore::with_prefix(req.base_bytes()?, params.prefix)))
        }),
    );
    registry.register(
        "HashPrefixStore",
        StoreType::single(|mut req| {
            let transformer = req.params::<HashPrefixParams>()?.transformer()?;
            Ok(bytes(HashPrefixStore::new(req.base_bytes()?, transformer)))
        }),
    );
    registry.register(
        "UrlEncodingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(UrlEncodingStore::wrap(req.base_bytes()?)))
        }),
    );
    registry.register(
        "FilesystemSafeStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(FilesystemSafeStore::wrap(req.base_bytes()?)))
        }),
    );
    registry.register(
        "RegexValidatingStore",
        StoreType::single(|mut req| {
            let params: PatternParams = req.params()?;
            let store = RegexValidatingStore::with_pattern(req.base_bytes()?, &params.pattern)?;
            Ok(bytes(store))
        }),
    );
    registry.register(
        "UrlValidatingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(UrlValidatingStore::wrap(req.base_bytes()?)))
        }),
    );
    registry.register(
        "MirroringStore",
        StoreType::list(|mut req| {
            req.params::<NoParams>()?;
            Ok(bytes(MirroringStore::new(req.children_bytes()?)))
        }),
    );
    registry.register(
        "CachingStore",
        StoreType::roles(CACHE_ROLES, |mut req| {
            req.params::<NoParams>()?;
            let main = req.role_bytes("main_store")?;
            let cache = req.role_bytes("cache_store")?;
            Ok(bytes(CachingStore::new(main, cache)))
        }),
    );
}

fn register_async_backends(registry: &mut StoreRegistry) {
    registry.register(
        "AsyncDictStore",
        StoreType::leaf(|req| {
            let objects = req.params::<DictParams>()?.into_objects(&req)?;
            Ok(async_bytes(AsyncDictStore::with_objects(objects)))
        }),
    );
    registry.register(
        "AsyncFilesystemStore",
        StoreType::leaf(|req| {
            let params: RootParams = req.params()?;
            Ok(async_bytes(AsyncFilesystemStore::new(params.root_path)))
        }),
    );
    registry.register(
        "AsyncSafeFilesystemStore",
        StoreType::leaf(|req| {
            let params: RootParams = req.params()?;
            Ok(async_bytes(async_safe_filesystem_store(params.root_path)))
        }),
    );
    registry.register(
        "AsyncHashdirStore",
        StoreType::leaf(|req| {
            let params: HashdirParams = req.params()?;
            let store =
                AsyncHashdirStore::with_layout(params.root_path, params.width, params.depth)?;
            Ok(async_bytes(store))
        }),
    );
    registry.register(
        "AsyncSqliteStore",
        StoreType::leaf(|req| {
            let params: SqliteParams = req.params()?;
            Ok(async_bytes(BlockingStore::wrap(SqliteStore::new(params.db_path))))
        }),
    );
    registry.register(
        "AsyncHttpStore",
        StoreType::leaf(|req| {
            let params: HttpParams = req.params()?;
            Ok(async_bytes(AsyncHttpStore::with_redirects(
                params.follow_redirects,
            )?))
        }),
    );
}

fn register_async_decorators(registry: &mut StoreRegistry) {
    registry.register(
        "BlockingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(BlockingStore::new(req.base_bytes()?)))
        }),
    );
    registry.register(
        "AsyncIdentityStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncIdentityStore::new(req.base_async()?)))
        }),
    );
    registry.register(
        "AsyncReadonlyStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncReadonlyStore::new(req.base_async()?)))
        }),
    );
    registry.register(
        "AsyncLoggingStore",
        StoreType::single(|mut req| {
            let name = req.params::<LoggingParams>()?.name_or(&req);
            Ok(async_bytes(AsyncLoggingStore::with_name(req.base_async()?, name)))
        }),
    );
    registry.register(
        "AsyncTransformingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncTransformingStore::new(
                req.base_async()?,
                IdentityTransformer,
            )))
        }),
    );
    registry.register(
        "AsyncGzipStore",
        StoreType::single(|mut req| {
            let params: GzipParams = req.params()?;
            let mut store = AsyncGzipStore::new(req.base_async()?, params.transformer()?);
            if let Some(offload) = params.offload {
                store = store.offload(offload);
            }
            Ok(async_bytes(store))
        }),
    );
    registry.register(
        "AsyncZstdStore",
        StoreType::single(|mut req| {
            let params: ZstdParams = req.params()?;
            let mut store = AsyncZstdStore::new(req.base_async()?, params.transformer()?);
            if let Some(offload) = params.offload {
                store = store.offload(offload);
            }
            Ok(async_bytes(store))
        }),
    );
    registry.register(
        "AsyncBase64Store",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncBase64Store::new(
                req.base_async()?,
                Base64Transformer,
            )))
        }),
    );
    registry.register(
        "AsyncTextEncodingStore",
        StoreType::single(|mut req| {
            let params: TextParams = req.params()?;
            let transformer = TextEncodingTransformer::from_label(&params.encoding)?;
            let store = AsyncTextEncodingStore::new(req.base_async()?, transformer);
            Ok(BuiltStore::AsyncText(Arc::new(store)))
        }),
    );
    registry.register(
        "AsyncJsonStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            let store = AsyncJsonStore::new(req.base_async()?, JsonTransformer);
            Ok(BuiltStore::AsyncJson(Arc::new(store)))
        }),
    );
    registry.register(
        "AsyncPrefixStore",
        StoreType::single(|mut req| {
            let params: PrefixParams = req.params()?;
            Ok(async_bytes(AsyncPrefixStore::with_prefix(
                req.base_async()?,
                params.prefix,
            )))
        }),
    );
    registry.register(
        "AsyncHashPrefixStore",
        StoreType::single(|mut req| {
            let transformer = req.params::<HashPrefixParams>()?.transformer()?;
            Ok(async_bytes(AsyncHashPrefixStore::new(
                req.base_async()?,
                transformer,
            )))
        }),
    );
    registry.register(
        "AsyncUrlEncodingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncUrlEncodingStore::wrap(req.base_async()?)))
        }),
    );
    registry.register(
        "AsyncRegexValidatingStore",
        StoreType::single(|mut req| {
            let params: PatternParams = req.params()?;
            let store = AsyncRegexValidatingStore::with_pattern(req.base_async()?, &params.pattern)?;
            Ok(async_bytes(store))
        }),
    );
    registry.register(
        "AsyncUrlValidatingStore",
        StoreType::single(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncUrlValidatingStore::wrap(req.base_async()?)))
        }),
    );
    registry.register(
        "AsyncFanoutStore",
        StoreType::list(|mut req| {
            req.params::<NoParams>()?;
            Ok(async_bytes(AsyncFanoutStore::new(req.children_async()?)))
        }),
    );
    registry.register(
        "AsyncCachingStore",
        StoreType::roles(CACHE_ROLES, |mut req| {
            req.params::<NoParams>()?;
            let main = req.role_async("main_store")?;
            let cache = req.role_async("cache_store")?;
            Ok(async_bytes(AsyncCachingStore::new(main, cache)))
        }),
    );
}
