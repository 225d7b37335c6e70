//! Async store graphs built from documents.

use futures::TryStreamExt;
use layerstore_config::{ConfigError, Environment, StoreBuilder, StoreConfig};
use layerstore_core::{AsyncObjectStore, ErrorKind};

fn builder(yaml: &str) -> StoreBuilder {
    StoreBuilder::new(StoreConfig::from_yaml_str(yaml).unwrap())
        .with_environment(Environment::fixed([("CACHE_PREFIX", "hot/")]))
}

#[tokio::test]
async fn fanout_over_cache_and_bridged_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!(
        r#"
main: fanout
stores:
  fanout:
    type: AsyncFanoutStore
    base: [cached, archive]
  cached:
    type: AsyncCachingStore
    base:
      main_store: disk
      cache_store: hot
  disk:
    type: AsyncFilesystemStore
    config:
      root_path: "{root}"
  hot:
    type: AsyncPrefixStore
    config:
      prefix: "${{CACHE_PREFIX}}"
    base: memory
  memory:
    type: AsyncDictStore
  archive:
    type: AsyncSqliteStore
    config:
      db_path: "{db}"
"#,
        root = dir.path().join("files").display(),
        db = dir.path().join("objects.db").display(),
    );
    let store = builder(&yaml).build_async(None).unwrap();

    store.open().await.unwrap();
    store.put("report.txt", b"quarterly".to_vec()).await.unwrap();
    assert_eq!(store.get("report.txt").await.unwrap(), b"quarterly");
    assert!(dir.path().join("files").join("report.txt").is_file());

    let keys: Vec<String> = store.keys().await.unwrap().try_collect().await.unwrap();
    assert!(keys.contains(&"report.txt".to_string()));

    store.delete("report.txt").await.unwrap();
    assert!(!store.exists("report.txt").await.unwrap());
    store.close().await.unwrap();
}

#[tokio::test]
async fn compressed_readonly_view() {
    let store = builder(
        r#"
stores:
  writer:
    type: AsyncZstdStore
    config: {level: 3}
    base: bridged
  bridged:
    type: BlockingStore
    base: memory
  memory:
    type: DictStore
  view:
    type: AsyncReadonlyStore
    base: writer
"#,
    );
    let writer = store.build_async(Some("writer")).unwrap();
    writer.put("k", vec![7u8; 4096]).await.unwrap();
    assert_eq!(writer.get("k").await.unwrap(), vec![7u8; 4096]);

    let view = store.build_async(Some("view")).unwrap();
    let err = view.put("k", b"x".to_vec()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
}

#[tokio::test]
async fn async_text_store() {
    let text = builder(
        r#"
main: text
stores:
  text: {type: AsyncTextEncodingStore, base: memory}
  memory:
    type: AsyncDictStore
    config:
      objects: {greeting: hello}
"#,
    )
    .build(None)
    .unwrap()
    .into_async_text("text")
    .unwrap();
    assert_eq!(text.get("greeting").await.unwrap(), "hello");
}

#[test]
fn async_decorator_rejects_sync_base() {
    let err = builder(
        r#"
stores:
  wrapped: {type: AsyncIdentityStore, base: memory}
  memory: {type: DictStore}
"#,
    )
    .build(Some("wrapped"))
    .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::TypeMismatch { expected: "async bytes", found: "bytes", .. }
    ));
}
