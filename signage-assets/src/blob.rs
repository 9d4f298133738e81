//! Blob handle registry.
//!
//! A blob handle is a process-local reference to validated image bytes.
//! Handles are never revoked implicitly: whoever holds one must release it,
//! and everything left is released in bulk at teardown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::decode::{DecodedInfo, ImageFormat};

/// Prefix of every handle issued by a [`BlobRegistry`].
pub const BLOB_SCHEME: &str = "blob:signage/";

/// Validated image bytes held behind a handle.
#[derive(Debug, Clone)]
pub struct Blob {
    /// Encoded image bytes.
    pub bytes: Arc<[u8]>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Container format.
    pub format: ImageFormat,
}

/// Allocation statistics for leak monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobStats {
    /// Handles issued.
    pub allocated: u64,
    /// Handles released.
    pub released: u64,
}

impl BlobStats {
    /// Handles still alive.
    #[must_use]
    pub fn live(&self) -> u64 {
        self.allocated.saturating_sub(self.released)
    }
}

#[derive(Debug, Default)]
struct Registry {
    blobs: HashMap<String, Blob>,
    stats: BlobStats,
}

/// Shared registry of live blob handles. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl BlobRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store validated bytes and return a fresh handle for them.
    pub fn allocate(&self, bytes: Vec<u8>, info: DecodedInfo) -> String {
        let handle = format!("{BLOB_SCHEME}{}", Uuid::new_v4());
        let mut registry = self.lock();
        registry.blobs.insert(
            handle.clone(),
            Blob {
                bytes: bytes.into(),
                width: info.width,
                height: info.height,
                format: info.format,
            },
        );
        registry.stats.allocated += 1;
        tracing::debug!(%handle, width = info.width, height = info.height, "blob allocated");
        handle
    }

    /// Look up a live handle.
    #[must_use]
    pub fn get(&self, handle: &str) -> Option<Blob> {
        self.lock().blobs.get(handle).cloned()
    }

    /// Whether `handle` is live.
    #[must_use]
    pub fn contains(&self, handle: &str) -> bool {
        self.lock().blobs.contains_key(handle)
    }

    /// Release one handle. Returns whether it was live.
    pub fn release(&self, handle: &str) -> bool {
        let mut registry = self.lock();
        let released = registry.blobs.remove(handle).is_some();
        if released {
            registry.stats.released += 1;
            tracing::debug!(%handle, "blob released");
        }
        released
    }

    /// Release every live handle. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let mut registry = self.lock();
        let count = registry.blobs.len();
        registry.blobs.clear();
        registry.stats.released += count as u64;
        if count > 0 {
            tracing::debug!(count, "released all blobs");
        }
        count
    }

    /// Number of live handles.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().blobs.len()
    }

    /// Allocation statistics.
    #[must_use]
    pub fn stats(&self) -> BlobStats {
        self.lock().stats
    }

    // The map stays consistent even if a holder panicked mid-operation.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
