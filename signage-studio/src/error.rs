//! Studio error types.

use thiserror::Error;

/// Result type for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors surfaced by the studio host.
///
/// Image load failures are not listed: they degrade to placeholders.
#[derive(Debug, Error)]
pub enum StudioError {
    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Host props could not be read or reference unknown entries.
    #[error("Invalid host props: {0}")]
    Props(String),

    /// The studio has been torn down.
    #[error("Studio has been torn down")]
    Closed,

    /// Reading a file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scene operation failed.
    #[error(transparent)]
    Canvas(#[from] signage_core::CanvasError),

    /// Object-store client setup failed.
    #[error(transparent)]
    Asset(#[from] signage_assets::AssetError),

    /// Export or upload client setup failed.
    #[error(transparent)]
    Render(#[from] signage_renderer::RenderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StudioError::Closed.to_string(), "Studio has been torn down");
        let err = StudioError::Props("unknown icon 7".into());
        assert_eq!(err.to_string(), "Invalid host props: unknown icon 7");
    }

    #[test]
    fn test_json_error_converts() {
        let err: StudioError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StudioError::Json(_)));
    }
}
