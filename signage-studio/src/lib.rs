//! # Signage Studio
//!
//! Host integration for the signage design engine.
//!
//! A [`Studio`] binds one host page to a composition session: it turns the
//! host props (background, icons, fonts, business presets) into scene
//! objects through the resource loader, keeps background requests ordered
//! so a superseded load never overwrites a newer one, releases image handles
//! once nothing uses them, and runs export followed by remote save.
//!
//! ## Modules
//!
//! - `config` - `CliArgs` parsed with clap and the JSON `StudioConfig`
//! - `props` - `HostProps` supplied by the embedding page
//! - `studio` - the `Studio` session itself

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod props;
pub mod studio;

pub use config::{CliArgs, ExportSettings, LoaderSettings, StudioConfig};
pub use error::{StudioError, StudioResult};
pub use props::{BackgroundSource, BusinessPresets, HostProps, IconRef};
pub use studio::{BackgroundRequest, ExportListener, Studio, ICON_PREFIX, PRESET_PREFIX};
