//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
///
/// Bounds violations are not errors: they are corrected in place
/// and reported as a [`crate::Correction`], never as an error.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Object not found on the drawing surface.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Invalid object operation.
    #[error("Invalid operation on object: {0}")]
    InvalidOperation(String),
}
