//! Object-store collaborator.
//!
//! The loader talks to remote storage through [`ObjectStore`] only; the wire
//! format belongs to the collaborator. [`HttpObjectStore`] is the reqwest
//! implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AssetError, AssetResult};

/// Raw payload returned by a transfer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedObject {
    /// Body bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` reported by the server, if any.
    pub content_type: Option<String>,
}

impl FetchedObject {
    /// Wrap raw bytes with no content type.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }
}

/// Remote storage that can hand out images by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Primary path: fetch the full object for `key`.
    async fn fetch_object_by_key(&self, key: &str) -> AssetResult<FetchedObject>;

    /// Ask for a short-lived signed URL for `key`, valid for `ttl`.
    async fn fetch_signed_url(&self, key: &str, ttl: Duration) -> AssetResult<Url>;

    /// Fallback transfer: fetch whatever a signed URL points at.
    async fn fetch_url(&self, url: &Url) -> AssetResult<FetchedObject>;
}

/// Response body of the presign endpoint.
#[derive(Debug, Deserialize)]
struct PresignResponse {
    success: bool,
    url: Option<String>,
    error: Option<String>,
}

/// [`ObjectStore`] backed by the storage REST API.
///
/// - `GET {base}/objects/{key}` returns the object bytes.
/// - `GET {base}/presign?key=..&expires=..` returns
///   `{ "success": bool, "url"?: string, "error"?: string }`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    http: Client,
    base: Url,
}

impl HttpObjectStore {
    /// Create a store client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InvalidUrl`] if the URL is malformed or cannot
    /// carry a path, or [`AssetError::Http`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> AssetResult<Self> {
        let base =
            Url::parse(base_url.as_ref()).map_err(|e| AssetError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(AssetError::InvalidUrl(format!("{base} cannot carry a path")));
        }
        let http = Client::builder()
            .user_agent(concat!("signage-assets/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `{base}/{segments..}`; object keys live under `objects/` so none can
    /// shadow `presign`.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> AssetResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| AssetError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> AssetResult<FetchedObject> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedObject {
            bytes,
            content_type,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch_object_by_key(&self, key: &str) -> AssetResult<FetchedObject> {
        let segments = key.split('/').filter(|s| !s.is_empty());
        let url = self.endpoint(std::iter::once("objects").chain(segments))?;
        tracing::debug!(%url, "fetching object by key");
        self.get_bytes(url).await
    }

    async fn fetch_signed_url(&self, key: &str, ttl: Duration) -> AssetResult<Url> {
        let mut url = self.endpoint(["presign"])?;
        url.query_pairs_mut()
            .append_pair("key", key)
            .append_pair("expires", &ttl.as_secs().to_string());

        let body: PresignResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !body.success {
            return Err(AssetError::UnexpectedResponse(
                body.error.unwrap_or_else(|| "presign refused".to_string()),
            ));
        }
        let signed = body
            .url
            .ok_or_else(|| AssetError::UnexpectedResponse("presign response without url".into()))?;
        Url::parse(&signed).map_err(|e| AssetError::InvalidUrl(e.to_string()))
    }

    async fn fetch_url(&self, url: &Url) -> AssetResult<FetchedObject> {
        tracing::debug!(%url, "fetching signed url");
        self.get_bytes(url.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_invalid_url_error() {
        let result = HttpObjectStore::new("not-a-valid-url");
        assert!(matches!(result, Err(AssetError::InvalidUrl(_))));

        let result = HttpObjectStore::new("mailto:someone@example.com");
        assert!(matches!(result, Err(AssetError::InvalidUrl(_))));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let store = HttpObjectStore::new("http://storage.local/api/").expect("store");
        let url = store.endpoint(["objects", "bg", "123.png"]).expect("url");
        assert_eq!(url.as_str(), "http://storage.local/api/objects/bg/123.png");
        let url = store.endpoint(["presign"]).expect("url");
        assert_eq!(url.as_str(), "http://storage.local/api/presign");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn fetch_object_by_key_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/objects/bg/123.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1, 2, 3]),
            )
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(server.uri()).expect("store");
        let object = store.fetch_object_by_key("bg/123.png").await.expect("object");
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn fetch_object_by_key_maps_status_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/objects/missing/key"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(server.uri()).expect("store");
        let result = store.fetch_object_by_key("missing/key").await;
        assert!(matches!(result, Err(AssetError::Http(_))));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn object_named_presign_does_not_hit_presign_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/objects/presign"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7, 7]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/presign"))
            .and(query_param("key", "presign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "url": "https://cdn.example.com/presign?sig=abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(server.uri()).expect("store");
        let object = store.fetch_object_by_key("presign").await.expect("object");
        assert_eq!(object.bytes, vec![7, 7]);
        let url = store
            .fetch_signed_url("presign", Duration::from_secs(60))
            .await
            .expect("url");
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn fetch_signed_url_parses_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presign"))
            .and(query_param("key", "bg/123.png"))
            .and(query_param("expires", "60"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "url": "https://cdn.example.com/bg/123.png?sig=abc"
            })))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(server.uri()).expect("store");
        let url = store
            .fetch_signed_url("bg/123.png", Duration::from_secs(60))
            .await
            .expect("url");
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn fetch_signed_url_propagates_refusal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/presign"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": "no such object"
            })))
            .mount(&server)
            .await;

        let store = HttpObjectStore::new(server.uri()).expect("store");
        let result = store
            .fetch_signed_url("missing/key", Duration::from_secs(60))
            .await;
        match result {
            Err(AssetError::UnexpectedResponse(message)) => assert_eq!(message, "no such object"),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
