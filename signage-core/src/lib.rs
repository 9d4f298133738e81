//! # Signage Core
//!
//! Core composition logic for signage designs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Composer                   │
//! ├─────────────────────────────────────────────┤
//! │  Scene            │  Selection Sync         │
//! │  - Objects        │  - Toolbar mirror       │
//! │  - Paint order    │  - Edit mode            │
//! │  - Snapshots      │  - Deferred focus       │
//! ├─────────────────────────────────────────────┤
//! │  Bounds Engine    │  Geometry / Text        │
//! │  - Rollback       │  - Rotated rects        │
//! │  - Scale-to-fit   │  - Text metrics         │
//! │  - Move-inside    │                         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Everything here is synchronous and free of I/O; image loading lives in
//! `signage-assets` and export in `signage-renderer`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bounds;
pub mod composer;
pub mod element;
pub mod error;
pub mod event;
pub mod geometry;
pub mod scene;
pub mod selection;
pub mod text;
pub mod viewport;

pub use bounds::{Correction, CorrectionPolicy};
pub use composer::{Composer, RemovalListener, SelectionListener};
pub use element::{
    ImagePayload, ObjectId, ObjectKind, RasterRef, SceneObject, Transform, TransformSnapshot,
    BACKGROUND_TAG, LOGO_TAG, PLACEHOLDER_SIZE,
};
pub use error::{CanvasError, CanvasResult};
pub use event::{InputEvent, KeyModifiers, Manipulation};
pub use geometry::Rect;
pub use scene::Scene;
pub use selection::{
    DeferredAction, EditPhase, SelectionSync, SyncEffect, ToolbarChange, ToolbarState,
    DOUBLE_CLICK_WINDOW_MS,
};
pub use text::{FontStyle, FontWeight, TextStyle};
pub use viewport::DisplayViewport;

/// Signage core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
