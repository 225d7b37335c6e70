//! Read-only HTTP backends: the key is the URL.

use async_trait::async_trait;
use layerstore_core::{AsyncObjectStore, KeyIter, KeyStream, ObjectStore, StoreError, StoreResult};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::debug;

const MAX_REDIRECTS: usize = 10;

fn redirect_policy(follow_redirects: bool) -> Policy {
    if follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    }
}

fn request_failed(key: &str, err: reqwest::Error) -> StoreError {
    StoreError::backend(format!("HTTP request failed for key {key}: {err}"))
}

fn status_error(status: StatusCode) -> StoreError {
    StoreError::backend(format!("HTTP error occurred: {status}"))
}

/// GET-only store over a blocking `reqwest` client.
///
/// `get` maps 200 to the body and 404 to not-found; `exists` issues HEAD and
/// retries with GET when the server answers 405. Writes and listing are not
/// supported. Do not call from inside an async runtime; use
/// [`AsyncHttpStore`] there.
#[derive(Debug)]
pub struct HttpStore {
    client: reqwest::blocking::Client,
}

impl HttpStore {
    /// A store that follows redirects.
    pub fn new() -> StoreResult<Self> {
        Self::with_redirects(true)
    }

    pub fn with_redirects(follow_redirects: bool) -> StoreResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .redirect(redirect_policy(follow_redirects))
            .build()
            .map_err(StoreError::backend)?;
        Ok(Self { client })
    }
}

impl ObjectStore for HttpStore {
    type Value = Vec<u8>;

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        debug!(url = key, "GET");
        let response = self
            .client
            .get(key)
            .send()
            .map_err(|err| request_failed(key, err))?;
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().map_err(|err| request_failed(key, err))?;
                Ok(body.to_vec())
            }
            StatusCode::NOT_FOUND => Err(StoreError::not_found(key)),
            status => Err(status_error(status)),
        }
    }

    fn put(&self, _key: &str, _value: Vec<u8>) -> StoreResult<()> {
        Err(StoreError::not_supported("http store", "put"))
    }

    fn exists(&self, key: &str) -> StoreResult<bool> {
        debug!(url = key, "HEAD");
        let response = self
            .client
            .head(key)
            .send()
            .map_err(|err| request_failed(key, err))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::METHOD_NOT_ALLOWED => {
                let response = self
                    .client
                    .get(key)
                    .send()
                    .map_err(|err| request_failed(key, err))?;
                Ok(response.status() == StatusCode::OK)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::not_supported("http store", "delete"))
    }

    fn keys(&self) -> StoreResult<KeyIter<'_>> {
        Err(StoreError::not_supported("http store", "keys"))
    }
}

/// Async [`HttpStore`].
#[derive(Clone, Debug)]
pub struct AsyncHttpStore {
    client: reqwest::Client,
}

impl AsyncHttpStore {
    pub fn new() -> StoreResult<Self> {
        Self::with_redirects(true)
    }

    pub fn with_redirects(follow_redirects: bool) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect_policy(follow_redirects))
            .build()
            .map_err(StoreError::backend)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AsyncObjectStore for AsyncHttpStore {
    type Value = Vec<u8>;

    async fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        debug!(url = key, "GET");
        let response = self
            .client
            .get(key)
            .send()
            .await
            .map_err(|err| request_failed(key, err))?;
        match response.status() {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|err| request_failed(key, err))?;
                Ok(body.to_vec())
            }
            StatusCode::NOT_FOUND => Err(StoreError::not_found(key)),
            status => Err(status_error(status)),
        }
    }

    async fn put(&self, _key: &str, _value: Vec<u8>) -> StoreResult<()> {
        Err(StoreError::not_supported("http store", "put"))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        debug!(url = key, "HEAD");
        let response = self
            .client
            .head(key)
            .send()
            .await
            .map_err(|err| request_failed(key, err))?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::METHOD_NOT_ALLOWED => {
                let response = self
                    .client
                    .get(key)
                    .send()
                    .await
                    .map_err(|err| request_failed(key, err))?;
                Ok(response.status() == StatusCode::OK)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::not_supported("http store", "delete"))
    }

    async fn keys<'a>(&'a self) -> StoreResult<KeyStream<'a>> {
        Err(StoreError::not_supported("http store", "keys"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerstore_core::ErrorKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"world".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/hello"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/no-head"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        server
    }

    // -----------------------------------------------------------------------
    // Async
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn async_get_maps_status_codes() {
        let server = server().await;
        let store = AsyncHttpStore::new().unwrap();
        let base = server.uri();

        assert_eq!(store.get(&format!("{base}/hello")).await.unwrap(), b"world");
        assert!(store
            .get(&format!("{base}/missing"))
            .await
            .unwrap_err()
            .is_not_found());
        let err = store.get(&format!("{base}/broken")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn async_exists_falls_back_to_get() {
        let server = server().await;
        let store = AsyncHttpStore::new().unwrap();
        let base = server.uri();

        assert!(store.exists(&format!("{base}/hello")).await.unwrap());
        assert!(store.exists(&format!("{base}/no-head")).await.unwrap());
        assert!(!store.exists(&format!("{base}/missing")).await.unwrap());
    }

    #[tokio::test]
    async fn async_writes_are_not_supported() {
        let store = AsyncHttpStore::new().unwrap();
        let err = store.put("http://localhost/x", Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert_eq!(
            store.delete("http://localhost/x").await.unwrap_err().kind(),
            ErrorKind::NotSupported
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_backend_error() {
        let store = AsyncHttpStore::new().unwrap();
        let err = store.get("not a url").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
    }

    // -----------------------------------------------------------------------
    // Blocking
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_store_matches_async() {
        let server = server().await;
        let base = server.uri();
        tokio::task::spawn_blocking(move || {
            let store = HttpStore::new().unwrap();
            assert_eq!(store.get(&format!("{base}/hello")).unwrap(), b"world");
            assert!(store.get(&format!("{base}/missing")).unwrap_err().is_not_found());
            assert!(store.exists(&format!("{base}/no-head")).unwrap());
            assert!(!store.exists(&format!("{base}/missing")).unwrap());
            assert_eq!(
                store.keys().err().unwrap().kind(),
                ErrorKind::NotSupported
            );
        })
        .await
        .unwrap();
    }
}
