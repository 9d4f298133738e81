//! Remote design save.
//!
//! Local export and remote persistence are independent outcomes: a design
//! whose upload fails is still a successful export, and the failure is
//! reported as a [`SaveOutcome::Failed`] warning.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{RenderError, RenderResult};
use crate::export::{ExportArtifacts, RasterSource, SceneExporter};
use signage_core::Scene;

/// Metadata sent alongside an uploaded design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignMeta {
    /// Human-readable design title.
    pub title: String,
    /// Surface width in pixels.
    pub surface_width: u32,
    /// Surface height in pixels.
    pub surface_height: u32,
    /// Number of objects in the scene, background included.
    pub object_count: usize,
}

impl DesignMeta {
    /// Describe `scene` under `title`.
    #[must_use]
    pub fn for_scene(title: impl Into<String>, scene: &Scene) -> Self {
        Self {
            title: title.into(),
            surface_width: scene.width(),
            surface_height: scene.height(),
            object_count: scene.len(),
        }
    }
}

/// Collaborator that persists a composed design.
#[async_trait]
pub trait DesignUploader: Send + Sync {
    /// Upload the exported design and return the saved record.
    async fn upload_design(
        &self,
        artifacts: &ExportArtifacts,
        meta: &DesignMeta,
    ) -> RenderResult<serde_json::Value>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    record: Option<serde_json::Value>,
    error: Option<String>,
}

/// [`DesignUploader`] posting multipart forms to `{base}/designs`.
#[derive(Debug, Clone)]
pub struct HttpDesignUploader {
    http: Client,
    endpoint: Url,
}

impl HttpDesignUploader {
    /// Create an uploader rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidUrl`] if the URL is malformed, or
    /// [`RenderError::RemoteSave`] if the HTTP client fails to build.
    pub fn new(base_url: impl AsRef<str>) -> RenderResult<Self> {
        let mut endpoint =
            Url::parse(base_url.as_ref()).map_err(|e| RenderError::InvalidUrl(e.to_string()))?;
        endpoint
            .path_segments_mut()
            .map_err(|()| RenderError::InvalidUrl(base_url.as_ref().to_string()))?
            .pop_if_empty()
            .push("designs");
        let http = Client::builder()
            .user_agent(concat!("signage-renderer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RenderError::RemoteSave(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    /// Full URL designs are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn form(artifacts: &ExportArtifacts, meta: &DesignMeta) -> RenderResult<Form> {
        let remote = |e: reqwest::Error| RenderError::RemoteSave(e.to_string());
        let meta_json =
            serde_json::to_string(meta).map_err(|e| RenderError::RemoteSave(e.to_string()))?;
        Ok(Form::new()
            .part(
                "design",
                Part::bytes(artifacts.png.clone())
                    .file_name("design.png")
                    .mime_str("image/png")
                    .map_err(remote)?,
            )
            .part(
                "document",
                Part::bytes(artifacts.pdf.clone())
                    .file_name("design.pdf")
                    .mime_str("application/pdf")
                    .map_err(remote)?,
            )
            .part(
                "meta",
                Part::text(meta_json)
                    .mime_str("application/json")
                    .map_err(remote)?,
            ))
    }
}

#[async_trait]
impl DesignUploader for HttpDesignUploader {
    async fn upload_design(
        &self,
        artifacts: &ExportArtifacts,
        meta: &DesignMeta,
    ) -> RenderResult<serde_json::Value> {
        let form = Self::form(artifacts, meta)?;
        tracing::debug!(url = %self.endpoint, bytes = artifacts.png.len(), "uploading design");

        let response = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| RenderError::RemoteSave(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::RemoteSave(format!("server returned {status}")));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| RenderError::RemoteSave(format!("invalid response: {e}")))?;

        if body.success {
            Ok(body.record.unwrap_or(serde_json::Value::Null))
        } else {
            Err(RenderError::RemoteSave(
                body.error.unwrap_or_else(|| "upload rejected".to_string()),
            ))
        }
    }
}

/// Result of the remote-save step.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The design was saved; carries the server's record.
    Saved(serde_json::Value),
    /// No uploader was configured.
    Skipped,
    /// The upload failed; local artifacts remain valid.
    Failed(String),
}

impl SaveOutcome {
    /// Whether the remote save failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Local artifacts plus the remote-save outcome.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Locally exported PNG and PDF.
    pub artifacts: ExportArtifacts,
    /// What happened to the remote save.
    pub save: SaveOutcome,
}

/// Export `scene` locally, then hand the result to `uploader`.
///
/// The remote save runs only after a successful local export, and its
/// failure never discards the artifacts.
///
/// # Errors
///
/// Returns [`RenderError::Export`] only if the local export fails.
pub async fn export_and_save(
    exporter: &SceneExporter,
    scene: &Scene,
    rasters: &dyn RasterSource,
    uploader: Option<&dyn DesignUploader>,
    meta: &DesignMeta,
) -> RenderResult<ExportReport> {
    let artifacts = exporter.export(scene, rasters)?;

    let save = match uploader {
        None => SaveOutcome::Skipped,
        Some(uploader) => match uploader.upload_design(&artifacts, meta).await {
            Ok(record) => {
                tracing::info!(title = %meta.title, "design saved remotely");
                SaveOutcome::Saved(record)
            }
            Err(e) => {
                tracing::warn!(title = %meta.title, "remote save failed, local export kept: {}", e);
                SaveOutcome::Failed(e.to_string())
            }
        },
    };

    Ok(ExportReport { artifacts, save })
}
