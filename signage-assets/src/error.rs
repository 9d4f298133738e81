//! Error types for asset loading.

use thiserror::Error;

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors raised while fetching or validating an image.
///
/// These never escape [`crate::ResourceLoader::resolve`], which always
/// yields an explicit `Ready` or `Failed` resource.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Network-level failure that may succeed on another attempt.
    #[error("transient I/O failure: {0}")]
    TransientIo(String),

    /// The payload is not a renderable image.
    #[error("payload is not a valid image: {0}")]
    Decode(String),

    /// A fetch or validation step did not finish in time.
    #[error("{stage} timed out after {millis}ms")]
    Timeout {
        /// Step that timed out.
        stage: &'static str,
        /// Timeout that elapsed.
        millis: u128,
    },

    /// The object-store URL is malformed.
    #[error("invalid object store URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, status, body).
    #[error("object store HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator answered with an unexpected or unsuccessful payload.
    #[error("unexpected object store response: {0}")]
    UnexpectedResponse(String),
}
