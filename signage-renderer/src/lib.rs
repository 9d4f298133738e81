//! # Signage Renderer
//!
//! Export pipeline for composed designs.
//!
//! ```text
//! Scene ──▶ SVG ──▶ resvg/tiny-skia ──▶ PNG (supersampled)
//!                                        │
//!                                        ├──▶ printpdf ──▶ PDF (A4, centred)
//!                                        │
//!                                        └──▶ DesignUploader (remote save)
//! ```
//!
//! Raster handles in the scene are looked up through a [`RasterSource`],
//! normally the loader's [`signage_assets::BlobRegistry`]. Objects whose
//! raster is gone are drawn as placeholders.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod upload;

pub use error::{RenderError, RenderResult};
pub use export::{
    EmbeddedRaster, ExportArtifacts, ExportConfig, PageLayout, RasterSource, SceneExporter,
};
pub use upload::{
    export_and_save, DesignMeta, DesignUploader, ExportReport, HttpDesignUploader, SaveOutcome,
};
