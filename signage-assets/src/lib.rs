//! # Signage Assets
//!
//! Loads design imagery from a remote object store.
//!
//! A storage key is resolved through a primary full-object fetch, then a
//! short-lived signed-URL fallback, with a bounded number of attempts in
//! total. Every payload is decode-validated before it counts as loaded, and
//! validated bytes live behind blob handles that must be released
//! explicitly.
//!
//! ```text
//! ObjectStore ──▶ ResourceLoader ──▶ decode::validate ──▶ BlobRegistry
//!  (HTTP)          (retry, dedup,      (timeout-bounded)    (handles)
//!                   liveness)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blob;
pub mod decode;
pub mod error;
pub mod loader;
pub mod store;

pub use blob::{Blob, BlobRegistry, BlobStats, BLOB_SCHEME};
pub use decode::{encode_png, DecodedInfo, ImageFormat};
pub use error::{AssetError, AssetResult};
pub use loader::{
    ImageResource, LoadedImage, LoaderConfig, ResourceLoader, ResourceState, RetryConfig,
    SettleToken,
};
pub use store::{FetchedObject, HttpObjectStore, ObjectStore};
