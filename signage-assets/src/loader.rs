//! Resource loader with fallback, bounded retries and liveness tokens.
//!
//! `resolve(key)` walks a fixed attempt sequence for one key:
//!
//! ```text
//! attempt 1: primary    fetch_object_by_key ─┐
//! attempt 2: fallback   fetch_signed_url ────┤── validate ──▶ Ready(handle)
//! attempt 3: fallback   fetch_url ───────────┘
//!                                   cap reached ───────────▶ Failed
//! ```
//!
//! Attempts for one key are strictly sequential and shared by every caller
//! that asks while the sequence is in flight. Each sequence carries a
//! single-assignment [`SettleToken`]; once it is spent (by settling, by
//! [`ResourceLoader::release`] or by teardown) the sequence can no longer
//! write to the cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use signage_core::RasterRef;

use crate::blob::BlobRegistry;
use crate::decode::{self, ImageFormat};
use crate::error::{AssetError, AssetResult};
use crate::store::{FetchedObject, ObjectStore};

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, primary and fallback combined.
    pub max_attempts: u32,
    /// Initial delay between attempts in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 2_000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay after a given failed attempt (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(base_delay.min(self.max_delay_ms as f64) as u64)
    }
}

/// Loader settings.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Timeout for each transfer (object fetch, presign, signed download).
    pub fetch_timeout: Duration,
    /// Timeout for decode validation of a fetched payload.
    pub validation_timeout: Duration,
    /// Validity requested for signed URLs.
    pub signed_url_ttl: Duration,
    /// Attempt cap and backoff.
    pub retry: RetryConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
            validation_timeout: Duration::from_secs(5),
            signed_url_ttl: Duration::from_secs(60),
            retry: RetryConfig::default(),
        }
    }
}

/// A validated image available behind a blob handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Blob handle owned by the loader's registry.
    pub handle: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container format.
    pub format: ImageFormat,
}

impl LoadedImage {
    /// Reference suitable for a scene object's image payload.
    #[must_use]
    pub fn raster_ref(&self) -> RasterRef {
        RasterRef {
            handle: self.handle.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Lifecycle state of an image resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Never requested (or released).
    Idle,
    /// An attempt sequence is in flight.
    Loading,
    /// Validated and cached.
    Ready(LoadedImage),
    /// Every attempt failed; callers must draw a placeholder.
    Failed,
}

/// An image resource identified by its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    /// Storage key.
    pub key: String,
    /// Current state.
    pub state: ResourceState,
}

impl ImageResource {
    fn new(key: &str, state: ResourceState) -> Self {
        Self {
            key: key.to_string(),
            state,
        }
    }

    /// The loaded image, if ready.
    #[must_use]
    pub fn image(&self) -> Option<&LoadedImage> {
        match &self.state {
            ResourceState::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Blob handle, or `None` when a placeholder must be drawn.
    #[must_use]
    pub fn handle(&self) -> Option<&str> {
        self.image().map(|i| i.handle.as_str())
    }

    /// Raster reference, or `None` when a placeholder must be drawn.
    #[must_use]
    pub fn raster_ref(&self) -> Option<RasterRef> {
        self.image().map(LoadedImage::raster_ref)
    }

    /// Whether the resource is ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, ResourceState::Ready(_))
    }

    /// Whether the resource failed terminally.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.state, ResourceState::Failed)
    }
}

/// Single-assignment guard for one attempt sequence.
///
/// Exactly one party spends the token: the sequence when it settles, or the
/// owner when it cancels. Whoever loses the race must not touch shared state.
#[derive(Debug, Default)]
pub struct SettleToken {
    settled: AtomicBool,
}

impl SettleToken {
    /// Spend the token. Returns `false` if it was already spent.
    pub fn try_settle(&self) -> bool {
        self.settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the token has been spent.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

type SharedLoad = Shared<BoxFuture<'static, ImageResource>>;

enum EntryState {
    Loading {
        load: SharedLoad,
        token: Arc<SettleToken>,
    },
    Ready(LoadedImage),
    Failed,
}

struct Entry {
    state: EntryState,
    /// Attempts made by the current (or last) sequence.
    attempts: u32,
}

struct Inner {
    store: Arc<dyn ObjectStore>,
    blobs: BlobRegistry,
    config: LoaderConfig,
    entries: Mutex<HashMap<String, Entry>>,
    closed: AtomicBool,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves storage keys to validated, cached blob handles.
///
/// Cheap to clone; clones share the cache, the registry and the liveness
/// state.
#[derive(Clone)]
pub struct ResourceLoader {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("config", &self.inner.config)
            .field("entries", &self.inner.lock().len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl ResourceLoader {
    /// Create a loader over `store` with a fresh blob registry.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, config: LoaderConfig) -> Self {
        Self::with_registry(store, config, BlobRegistry::new())
    }

    /// Create a loader that allocates into an existing registry.
    #[must_use]
    pub fn with_registry(
        store: Arc<dyn ObjectStore>,
        config: LoaderConfig,
        blobs: BlobRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                blobs,
                config,
                entries: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The blob registry holding every handle this loader issued.
    #[must_use]
    pub fn blobs(&self) -> &BlobRegistry {
        &self.inner.blobs
    }

    /// Loader settings.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Resolve `key` to an image resource.
    ///
    /// Returns the cached entry when the key is ready, joins the in-flight
    /// sequence when it is loading, and starts a fresh sequence when it is
    /// idle or previously failed. Never fails: the result is `Ready` or
    /// `Failed`.
    pub async fn resolve(&self, key: &str) -> ImageResource {
        let load = match self.begin(key) {
            Ok(done) => return done,
            Err(load) => load,
        };
        load.await
    }

    /// Current state of `key` without starting any work.
    #[must_use]
    pub fn state(&self, key: &str) -> ImageResource {
        let state = match self.inner.lock().get(key).map(|e| &e.state) {
            None => ResourceState::Idle,
            Some(EntryState::Loading { .. }) => ResourceState::Loading,
            Some(EntryState::Ready(image)) => ResourceState::Ready(image.clone()),
            Some(EntryState::Failed) => ResourceState::Failed,
        };
        ImageResource::new(key, state)
    }

    /// Attempts counted for `key`: 0 after success, the cap after terminal
    /// failure.
    #[must_use]
    pub fn attempts(&self, key: &str) -> u32 {
        self.inner.lock().get(key).map_or(0, |e| e.attempts)
    }

    /// Forget `key`, releasing its blob handle or cancelling its sequence.
    ///
    /// Returns whether an entry existed.
    pub fn release(&self, key: &str) -> bool {
        let Some(entry) = self.inner.lock().remove(key) else {
            return false;
        };
        match entry.state {
            EntryState::Ready(image) => {
                self.inner.blobs.release(&image.handle);
            }
            EntryState::Loading { token, .. } => {
                token.try_settle();
            }
            EntryState::Failed => {}
        }
        tracing::debug!(key, "resource released");
        true
    }

    /// Shut the loader down: cancel every sequence, release every handle.
    ///
    /// After teardown `resolve` returns `Failed` immediately and late
    /// continuations are discarded. Returns the number of handles released.
    pub fn teardown(&self) -> usize {
        self.inner.closed.store(true, Ordering::Release);
        let entries = std::mem::take(&mut *self.inner.lock());
        for entry in entries.into_values() {
            if let EntryState::Loading { token, .. } = entry.state {
                token.try_settle();
            }
        }
        let released = self.inner.blobs.release_all();
        tracing::info!(released, "resource loader torn down");
        released
    }

    /// Whether [`teardown`](Self::teardown) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Return a settled result, or the shared in-flight sequence for `key`.
    fn begin(&self, key: &str) -> Result<ImageResource, SharedLoad> {
        if self.is_closed() {
            return Ok(ImageResource::new(key, ResourceState::Failed));
        }
        let mut entries = self.inner.lock();
        match entries.get(key).map(|e| &e.state) {
            Some(EntryState::Ready(image)) => {
                return Ok(ImageResource::new(key, ResourceState::Ready(image.clone())));
            }
            Some(EntryState::Loading { load, .. }) => return Err(load.clone()),
            Some(EntryState::Failed) | None => {}
        }

        let token = Arc::new(SettleToken::default());
        let load = run_sequence(Arc::clone(&self.inner), key.to_string(), Arc::clone(&token))
            .boxed()
            .shared();
        entries.insert(
            key.to_string(),
            Entry {
                state: EntryState::Loading {
                    load: load.clone(),
                    token,
                },
                attempts: 0,
            },
        );
        tracing::debug!(key, "resolution started");
        Err(load)
    }
}

async fn run_sequence(inner: Arc<Inner>, key: String, token: Arc<SettleToken>) -> ImageResource {
    let retry = inner.config.retry.clone();
    let max_attempts = retry.max_attempts.max(1);

    for attempt in 0..max_attempts {
        if !record_attempt(&inner, &key, &token, attempt + 1) {
            return stale(&key);
        }

        let result = if attempt == 0 {
            primary(&inner, &key).await
        } else {
            fallback(&inner, &key).await
        };

        match result {
            Ok(loaded) => return settle_ready(&inner, &key, &token, loaded),
            Err(error) => {
                let path = if attempt == 0 { "primary" } else { "fallback" };
                if attempt + 1 < max_attempts {
                    let delay = retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        "resolve {} via {} failed (attempt {}/{}), retrying in {}ms: {}",
                        key,
                        path,
                        attempt + 1,
                        max_attempts,
                        delay.as_millis(),
                        error
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    tracing::warn!(
                        "resolve {} via {} failed (attempt {}/{}), giving up: {}",
                        key,
                        path,
                        attempt + 1,
                        max_attempts,
                        error
                    );
                }
            }
        }
    }

    settle_failed(&inner, &key, &token)
}

async fn primary(inner: &Inner, key: &str) -> AssetResult<LoadedImage> {
    let object = with_timeout(
        "primary fetch",
        inner.config.fetch_timeout,
        inner.store.fetch_object_by_key(key),
    )
    .await?;
    validate(inner, object).await
}

async fn fallback(inner: &Inner, key: &str) -> AssetResult<LoadedImage> {
    let url = with_timeout(
        "presign",
        inner.config.fetch_timeout,
        inner.store.fetch_signed_url(key, inner.config.signed_url_ttl),
    )
    .await?;
    let object = with_timeout(
        "signed fetch",
        inner.config.fetch_timeout,
        inner.store.fetch_url(&url),
    )
    .await?;
    validate(inner, object).await
}

async fn with_timeout<T, F>(stage: &'static str, timeout: Duration, future: F) -> AssetResult<T>
where
    F: std::future::Future<Output = AssetResult<T>>,
{
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_else(|_| {
            Err(AssetError::Timeout {
                stage,
                millis: timeout.as_millis(),
            })
        })
}

async fn validate(inner: &Inner, object: FetchedObject) -> AssetResult<LoadedImage> {
    let (bytes, mut info) =
        decode::validate_with_timeout(object.bytes, inner.config.validation_timeout).await?;
    if info.format == ImageFormat::Unknown {
        if let Some(content_type) = &object.content_type {
            info.format = ImageFormat::from_mime(content_type);
        }
    }
    let handle = inner.blobs.allocate(bytes, info);
    Ok(LoadedImage {
        handle,
        width: info.width,
        height: info.height,
        format: info.format,
    })
}

/// Count an attempt for a live sequence. Returns `false` if it is stale.
fn record_attempt(inner: &Inner, key: &str, token: &SettleToken, attempt: u32) -> bool {
    if token.is_settled() || inner.closed.load(Ordering::Acquire) {
        return false;
    }
    match inner.lock().get_mut(key) {
        Some(entry) => {
            entry.attempts = attempt;
            true
        }
        None => false,
    }
}

fn settle_ready(
    inner: &Inner,
    key: &str,
    token: &SettleToken,
    loaded: LoadedImage,
) -> ImageResource {
    let mut entries = inner.lock();
    if inner.closed.load(Ordering::Acquire) || !token.try_settle() {
        drop(entries);
        inner.blobs.release(&loaded.handle);
        return stale(key);
    }
    entries.insert(
        key.to_string(),
        Entry {
            state: EntryState::Ready(loaded.clone()),
            attempts: 0,
        },
    );
    tracing::info!(key, handle = %loaded.handle, "resource ready");
    ImageResource::new(key, ResourceState::Ready(loaded))
}

fn settle_failed(inner: &Inner, key: &str, token: &SettleToken) -> ImageResource {
    let mut entries = inner.lock();
    if inner.closed.load(Ordering::Acquire) || !token.try_settle() {
        return stale(key);
    }
    if let Some(entry) = entries.get_mut(key) {
        entry.state = EntryState::Failed;
    }
    tracing::warn!(key, "resource failed; placeholder required");
    ImageResource::new(key, ResourceState::Failed)
}

fn stale(key: &str) -> ImageResource {
    tracing::warn!(key, "discarding result of superseded resolution");
    ImageResource::new(key, ResourceState::Failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(2_000));
    }

    #[test]
    fn test_loader_config_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.validation_timeout, Duration::from_secs(5));
        assert_eq!(config.signed_url_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_settle_token_is_single_assignment() {
        let token = SettleToken::default();
        assert!(!token.is_settled());
        assert!(token.try_settle());
        assert!(!token.try_settle());
        assert!(token.is_settled());
    }

    #[test]
    fn test_image_resource_accessors() {
        let ready = ImageResource::new(
            "k",
            ResourceState::Ready(LoadedImage {
                handle: "blob:signage/x".to_string(),
                width: 3,
                height: 2,
                format: ImageFormat::Png,
            }),
        );
        assert!(ready.is_ready());
        assert_eq!(ready.handle(), Some("blob:signage/x"));
        assert_eq!(ready.raster_ref().map(|r| (r.width, r.height)), Some((3, 2)));

        let failed = ImageResource::new("k", ResourceState::Failed);
        assert!(failed.is_failed());
        assert!(failed.handle().is_none());
    }
}
