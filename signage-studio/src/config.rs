//! Command-line arguments and studio configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use signage_assets::{LoaderConfig, RetryConfig};
use signage_renderer::ExportConfig;

use crate::error::{StudioError, StudioResult};

/// Command-line arguments for signage-studio.
#[derive(Debug, Clone, Parser)]
#[command(name = "signage-studio")]
#[command(about = "Compose a signage design from host props and export it")]
#[command(version)]
pub struct CliArgs {
    /// Host props JSON (background, icons, fonts, business presets)
    #[arg(long, env = "SIGNAGE_PROPS")]
    pub props: PathBuf,

    /// Storage and design API base URL (e.g., <http://localhost:8080/api>)
    #[arg(long, env = "SIGNAGE_API_URL")]
    pub api_url: Option<String>,

    /// Studio configuration JSON
    #[arg(long, env = "SIGNAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the PNG and PDF are written to
    #[arg(long, short, default_value = "out")]
    pub out_dir: PathBuf,

    /// Base file name and design title
    #[arg(long, default_value = "design")]
    pub name: String,

    /// Drawing surface width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Drawing surface height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Save the design remotely after exporting
    #[arg(long)]
    pub upload: bool,
}

/// Resource loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Per-transfer timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Decode validation timeout in seconds.
    pub validation_timeout_secs: u64,
    /// Signed-URL validity in seconds.
    pub signed_url_ttl_secs: u64,
    /// Total attempts per key, primary and fallback combined.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            validation_timeout_secs: 5,
            signed_url_ttl_secs: 60,
            max_attempts: 3,
            retry_delay_ms: 250,
        }
    }
}

impl From<&LoaderSettings> for LoaderConfig {
    fn from(settings: &LoaderSettings) -> Self {
        Self {
            fetch_timeout: Duration::from_secs(settings.fetch_timeout_secs),
            validation_timeout: Duration::from_secs(settings.validation_timeout_secs),
            signed_url_ttl: Duration::from_secs(settings.signed_url_ttl_secs),
            retry: RetryConfig {
                max_attempts: settings.max_attempts,
                initial_delay_ms: settings.retry_delay_ms,
                ..RetryConfig::default()
            },
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Supersampling multiplier.
    pub supersample: f64,
    /// PDF page margin in millimetres.
    pub page_margin_mm: f32,
    /// DPI for PDF placement.
    pub dpi: f32,
    /// Load system fonts for text.
    pub system_fonts: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            page_margin_mm: 10.0,
            dpi: 96.0,
            system_fonts: true,
        }
    }
}

impl From<&ExportSettings> for ExportConfig {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            supersample: settings.supersample,
            dpi: settings.dpi,
            page_margin_mm: settings.page_margin_mm,
            system_fonts: settings.system_fonts,
            ..ExportConfig::default()
        }
    }
}

/// Studio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Storage and design API base URL.
    pub api_url: String,
    /// Drawing surface width in pixels.
    pub width: u32,
    /// Drawing surface height in pixels.
    pub height: u32,
    /// Attempt remote save after export.
    pub upload: bool,
    /// Loader settings.
    pub loader: LoaderSettings,
    /// Export settings.
    pub export: ExportSettings,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StudioConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            width: 800,
            height: 400,
            upload: false,
            loader: LoaderSettings::default(),
            export: ExportSettings::default(),
        }
    }

    /// Read a configuration file; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the
    /// configuration is invalid.
    pub fn from_file(path: &Path) -> StudioResult<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration for a run: the config file if given, then
    /// command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or the result is
    /// invalid.
    pub fn from_args(args: &CliArgs) -> StudioResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::new(),
        };
        if let Some(url) = &args.api_url {
            config.api_url.clone_from(url);
        }
        if let Some(width) = args.width {
            config.width = width;
        }
        if let Some(height) = args.height {
            config.height = height;
        }
        config.upload |= args.upload;
        config.validate()?;
        Ok(config)
    }

    /// Loader configuration derived from these settings.
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::from(&self.loader)
    }

    /// Export configuration derived from these settings.
    #[must_use]
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig::from(&self.export)
    }

    fn validate(&self) -> StudioResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(StudioError::Config(format!(
                "surface must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.loader.max_attempts == 0 {
            return Err(StudioError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}
