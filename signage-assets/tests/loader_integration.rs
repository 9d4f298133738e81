//! Resource Loader Integration Tests
//!
//! Tests the attempt sequence end to end:
//! - Primary timeout with fallback recovery
//! - Retry cap and fresh sequences after failure
//! - Concurrent deduplication
//! - Blob lifecycle (release, teardown, stale continuations)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use signage_assets::{
    encode_png, AssetError, AssetResult, FetchedObject, HttpObjectStore,
    LoaderConfig, ObjectStore, ResourceLoader, ResourceState, RetryConfig,
};
use url::Url;

/// How a mocked transfer path behaves.
#[derive(Clone)]
enum Behavior {
    /// Return these bytes.
    Bytes(Vec<u8>),
    /// Fail with a transient error.
    Fail,
    /// Wait, then return these bytes.
    Slow(Duration, Vec<u8>),
}

impl Behavior {
    async fn run(&self) -> AssetResult<FetchedObject> {
        match self {
            Self::Bytes(bytes) => Ok(FetchedObject::from_bytes(bytes.clone())),
            Self::Fail => Err(AssetError::TransientIo("connection reset".into())),
            Self::Slow(delay, bytes) => {
                tokio::time::sleep(*delay).await;
                Ok(FetchedObject::from_bytes(bytes.clone()))
            }
        }
    }
}

struct MockStore {
    primary: Behavior,
    signed: Behavior,
    primary_calls: AtomicUsize,
    presign_calls: AtomicUsize,
}

impl MockStore {
    fn new(primary: Behavior, signed: Behavior) -> Arc<Self> {
        Arc::new(Self {
            primary,
            signed,
            primary_calls: AtomicUsize::new(0),
            presign_calls: AtomicUsize::new(0),
        })
    }

    fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    fn presign_calls(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn fetch_object_by_key(&self, _key: &str) -> AssetResult<FetchedObject> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        self.primary.run().await
    }

    async fn fetch_signed_url(&self, key: &str, ttl: Duration) -> AssetResult<Url> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(ttl, Duration::from_secs(60));
        Url::parse(&format!("https://signed.example/{key}"))
            .map_err(|e| AssetError::InvalidUrl(e.to_string()))
    }

    async fn fetch_url(&self, _url: &Url) -> AssetResult<FetchedObject> {
        self.signed.run().await
    }
}

fn png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(8, 4, image::Rgba([200, 200, 200, 255]));
    encode_png(&img).expect("encode")
}

fn fast_config() -> LoaderConfig {
    LoaderConfig {
        fetch_timeout: Duration::from_millis(100),
        validation_timeout: Duration::from_secs(2),
        signed_url_ttl: Duration::from_secs(60),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        },
    }
}

fn loader(store: &Arc<MockStore>) -> ResourceLoader {
    let store: Arc<dyn ObjectStore> = store.clone();
    ResourceLoader::new(store, fast_config())
}

// ============================================================================
// Attempt Sequence
// ============================================================================

#[tokio::test]
async fn test_primary_timeout_recovers_via_fallback() {
    let store = MockStore::new(
        Behavior::Slow(Duration::from_millis(500), png()),
        Behavior::Bytes(png()),
    );
    let loader = loader(&store);

    let resource = loader.resolve("bg/123.png").await;
    assert!(resource.is_ready());
    let image = resource.image().expect("image");
    assert_eq!((image.width, image.height), (8, 4));
    assert_eq!(loader.attempts("bg/123.png"), 0);
    assert_eq!(store.primary_calls(), 1);
    assert_eq!(store.presign_calls(), 1);
    assert!(loader.blobs().contains(&image.handle));
}

#[tokio::test]
async fn test_exhausted_retries_fail_and_fresh_call_restarts() {
    let store = MockStore::new(Behavior::Fail, Behavior::Fail);
    let loader = loader(&store);

    let resource = loader.resolve("missing/key").await;
    assert!(resource.is_failed());
    assert!(resource.handle().is_none());
    assert_eq!(loader.attempts("missing/key"), 3);
    assert_eq!(store.primary_calls(), 1);
    assert_eq!(store.presign_calls(), 2);

    let again = loader.resolve("missing/key").await;
    assert!(again.is_failed());
    assert_eq!(store.primary_calls(), 2);
    assert_eq!(store.presign_calls(), 4);
    assert_eq!(loader.blobs().live_count(), 0);
}

#[tokio::test]
async fn test_undecodable_payload_is_a_failure() {
    let store = MockStore::new(
        Behavior::Bytes(b"<html>403 Forbidden</html>".to_vec()),
        Behavior::Bytes(png()),
    );
    let loader = loader(&store);

    let resource = loader.resolve("bg/html.png").await;
    assert!(resource.is_ready());
    assert_eq!(store.presign_calls(), 1);
    assert_eq!(loader.blobs().live_count(), 1);
}

#[tokio::test]
async fn test_ready_key_is_served_from_cache() {
    let store = MockStore::new(Behavior::Bytes(png()), Behavior::Fail);
    let loader = loader(&store);

    let first = loader.resolve("logo.png").await;
    let second = loader.resolve("logo.png").await;
    assert_eq!(first, second);
    assert_eq!(store.primary_calls(), 1);
    assert_eq!(loader.blobs().live_count(), 1);
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_sequence() {
    let store = MockStore::new(
        Behavior::Slow(Duration::from_millis(30), png()),
        Behavior::Fail,
    );
    let loader = loader(&store);

    let (a, b) = tokio::join!(loader.resolve("icon/7.png"), loader.resolve("icon/7.png"));
    assert!(a.is_ready());
    assert_eq!(a, b);
    assert_eq!(store.primary_calls(), 1);
    assert_eq!(loader.blobs().live_count(), 1);
}

#[tokio::test]
async fn test_state_reports_loading_while_in_flight() {
    let store = MockStore::new(
        Behavior::Slow(Duration::from_millis(50), png()),
        Behavior::Fail,
    );
    let loader = loader(&store);
    assert_eq!(loader.state("bg/1.png").state, ResourceState::Idle);

    let task = {
        let loader = loader.clone();
        tokio::spawn(async move { loader.resolve("bg/1.png").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(loader.state("bg/1.png").state, ResourceState::Loading);

    let resource = task.await.expect("join");
    assert!(resource.is_ready());
    assert!(loader.state("bg/1.png").is_ready());
}

// ============================================================================
// Blob Lifecycle
// ============================================================================

#[tokio::test]
async fn test_release_frees_handle() {
    let store = MockStore::new(Behavior::Bytes(png()), Behavior::Fail);
    let loader = loader(&store);

    let resource = loader.resolve("bg/old.png").await;
    let handle = resource.handle().expect("handle").to_string();
    assert!(loader.release("bg/old.png"));
    assert!(!loader.blobs().contains(&handle));
    assert_eq!(loader.state("bg/old.png").state, ResourceState::Idle);
    assert!(!loader.release("bg/old.png"));
}

#[tokio::test]
async fn test_release_mid_flight_discards_late_result() {
    let store = MockStore::new(
        Behavior::Slow(Duration::from_millis(60), png()),
        Behavior::Fail,
    );
    let loader = loader(&store);

    let task = {
        let loader = loader.clone();
        tokio::spawn(async move { loader.resolve("bg/superseded.png").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(loader.release("bg/superseded.png"));

    let resource = task.await.expect("join");
    assert!(!resource.is_ready());
    assert_eq!(loader.blobs().live_count(), 0);
    assert_eq!(loader.state("bg/superseded.png").state, ResourceState::Idle);
}

#[tokio::test]
async fn test_teardown_releases_everything_and_closes() {
    let store = MockStore::new(Behavior::Bytes(png()), Behavior::Fail);
    let loader = loader(&store);

    loader.resolve("a.png").await;
    loader.resolve("b.png").await;
    assert_eq!(loader.blobs().live_count(), 2);

    assert_eq!(loader.teardown(), 2);
    assert!(loader.is_closed());
    assert_eq!(loader.blobs().live_count(), 0);

    let late = loader.resolve("c.png").await;
    assert!(late.is_failed());
    assert_eq!(store.primary_calls(), 2);
}

#[tokio::test]
async fn test_teardown_mid_flight_leaks_nothing() {
    let store = MockStore::new(
        Behavior::Slow(Duration::from_millis(60), png()),
        Behavior::Fail,
    );
    let loader = loader(&store);

    let task = {
        let loader = loader.clone();
        tokio::spawn(async move { loader.resolve("bg/unmounted.png").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    loader.teardown();

    let resource = task.await.expect("join");
    assert!(!resource.is_ready());
    assert_eq!(loader.blobs().live_count(), 0);
    assert_eq!(loader.blobs().stats().live(), 0);
}

// ============================================================================
// HTTP Store
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_http_store_falls_back_to_signed_url() {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/objects/bg/123.png"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/presign"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "url": format!("{}/signed/bg/123.png", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/signed/bg/123.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png()),
        )
        .mount(&server)
        .await;

    let store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(server.uri()).expect("store"));
    let loader = ResourceLoader::new(store, fast_config());
    let resource = loader.resolve("bg/123.png").await;
    assert!(resource.is_ready());
    assert_eq!(loader.attempts("bg/123.png"), 0);
}
