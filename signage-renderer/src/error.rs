//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during export and save.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Local rasterization or document generation failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// The design was exported but could not be saved remotely.
    #[error("Remote save failed: {0}")]
    RemoteSave(String),

    /// The upload endpoint URL is malformed.
    #[error("Invalid upload URL: {0}")]
    InvalidUrl(String),

    /// Writing artifacts to disk failed.
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}
