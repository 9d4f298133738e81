//! The studio host: wires host props, the resource loader and the export
//! pipeline around a [`Composer`].

use std::collections::HashSet;
use std::sync::Arc;

use signage_assets::{HttpObjectStore, ImageResource, ObjectStore, ResourceLoader};
use signage_core::{
    Composer, ImagePayload, InputEvent, ObjectId, ObjectKind, SceneObject, SyncEffect,
    TextStyle, ToolbarChange, Transform, LOGO_TAG,
};
use signage_renderer::{
    export_and_save, DesignMeta, DesignUploader, ExportReport, HttpDesignUploader, SceneExporter,
};

use crate::config::StudioConfig;
use crate::error::{StudioError, StudioResult};
use crate::props::{BackgroundSource, HostProps};

/// Callback invoked after every export.
pub type ExportListener = Box<dyn Fn(&ExportReport) + Send + Sync>;

/// Prefix of the lookup name given to placed icons.
pub const ICON_PREFIX: &str = "icon-";

/// Prefix of the lookup name given to preset text objects.
pub const PRESET_PREFIX: &str = "preset-";

/// Distance kept between seeded objects and the surface edge.
const SEED_MARGIN: f64 = 40.0;

/// Longest edge a seeded logo is scaled down to.
const LOGO_MAX_EDGE: f64 = 120.0;

/// Ticket identifying one background request.
///
/// Only the most recent ticket may change the background; applying an
/// older one is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRequest {
    ticket: u64,
    key: String,
}

impl BackgroundRequest {
    /// Storage key this request resolves.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A design session bound to one host page.
pub struct Studio {
    composer: Composer,
    loader: ResourceLoader,
    exporter: SceneExporter,
    uploader: Option<Arc<dyn DesignUploader>>,
    props: HostProps,
    latest_background: u64,
    pending_background: Option<String>,
    on_export_complete: Option<ExportListener>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("composer", &self.composer)
            .field("loader", &self.loader)
            .field("uploads", &self.uploader.is_some())
            .field("latest_background", &self.latest_background)
            .finish_non_exhaustive()
    }
}

impl Studio {
    /// Create a studio over a `width` x `height` surface.
    #[must_use]
    pub fn new(
        width: u32,
        height: u32,
        props: HostProps,
        loader: ResourceLoader,
        exporter: SceneExporter,
    ) -> Self {
        Self {
            composer: Composer::new(width, height),
            loader,
            exporter,
            uploader: None,
            props,
            latest_background: 0,
            pending_background: None,
            on_export_complete: None,
        }
    }

    /// Connect to the HTTP collaborators named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid.
    pub fn connect(config: &StudioConfig, props: HostProps) -> StudioResult<Self> {
        let store: Arc<dyn ObjectStore> = Arc::new(HttpObjectStore::new(&config.api_url)?);
        let loader = ResourceLoader::new(store, config.loader_config());
        let exporter = SceneExporter::new(config.export_config());
        let mut studio = Self::new(config.width, config.height, props, loader, exporter);
        if config.upload {
            studio.uploader = Some(Arc::new(HttpDesignUploader::new(&config.api_url)?));
        }
        tracing::info!(
            api = %config.api_url,
            width = config.width,
            height = config.height,
            upload = config.upload,
            "studio connected"
        );
        Ok(studio)
    }

    /// Use `uploader` for remote saves.
    #[must_use]
    pub fn with_uploader(mut self, uploader: Arc<dyn DesignUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Set the callback invoked after every export.
    pub fn set_on_export_complete<F>(&mut self, callback: F)
    where
        F: Fn(&ExportReport) + Send + Sync + 'static,
    {
        self.on_export_complete = Some(Box::new(callback));
    }

    /// The composition session.
    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Mutable access to the composition session.
    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// The resource loader.
    #[must_use]
    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// The host props.
    #[must_use]
    pub fn props(&self) -> &HostProps {
        &self.props
    }

    /// Storage key of the background currently on the surface.
    #[must_use]
    pub fn background_key(&self) -> Option<&str> {
        self.composer
            .scene()
            .objects()
            .find_map(|object| match &object.kind {
                ObjectKind::Background(image) => Some(image.key.as_str()),
                _ => None,
            })
    }

    /// Whether the studio has been torn down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.loader.is_closed()
    }

    // ------------------------------------------------------------------
    // Background
    // ------------------------------------------------------------------

    /// Start a background change, superseding any earlier request.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Closed`] after teardown.
    pub fn request_background(&mut self, key: impl Into<String>) -> StudioResult<BackgroundRequest> {
        self.ensure_open()?;
        self.latest_background += 1;
        let key = key.into();
        self.pending_background = Some(key.clone());
        tracing::debug!(ticket = self.latest_background, key = %key, "background requested");
        Ok(BackgroundRequest {
            ticket: self.latest_background,
            key,
        })
    }

    /// Apply a resolved background.
    ///
    /// Returns `None` when `request` has been superseded or the studio torn
    /// down; the result is then discarded and its handle released unless
    /// something still uses it. A failed load still installs a placeholder
    /// background.
    pub fn apply_background(
        &mut self,
        request: &BackgroundRequest,
        resource: &ImageResource,
    ) -> Option<ObjectId> {
        if self.is_closed() || request.ticket != self.latest_background {
            tracing::warn!(
                ticket = request.ticket,
                latest = self.latest_background,
                key = %request.key,
                "ignoring superseded background"
            );
            if self.pending_background.as_deref() != Some(request.key.as_str()) {
                self.release_unreferenced([request.key.clone()]);
            }
            return None;
        }
        self.pending_background = None;

        let background = SceneObject::new(ObjectKind::Background(payload(&request.key, resource)));
        let (id, removed) = self.composer.set_background(background);
        self.release_unreferenced(removed.iter().filter_map(image_key));
        if resource.is_failed() {
            tracing::warn!(key = %request.key, "background unavailable, showing placeholder");
        } else {
            tracing::info!(key = %request.key, "background installed");
        }
        Some(id)
    }

    /// Resolve and install a background.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Closed`] after teardown.
    pub async fn set_background(&mut self, source: &BackgroundSource) -> StudioResult<Option<ObjectId>> {
        let request = self.request_background(source.key())?;
        let resource = self.loader.resolve(request.key()).await;
        Ok(self.apply_background(&request, &resource))
    }

    /// Install the background named in the host props, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Closed`] after teardown.
    pub async fn init_background(&mut self) -> StudioResult<Option<ObjectId>> {
        match self.props.background.clone() {
            Some(source) => self.set_background(&source).await,
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------------
    // Icons, logo, presets
    // ------------------------------------------------------------------

    /// Place the catalog icon `icon_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Props`] for an unknown icon, or
    /// [`StudioError::Closed`] after teardown.
    pub async fn add_icon(&mut self, icon_id: &str) -> StudioResult<ObjectId> {
        self.ensure_open()?;
        let icon = self
            .props
            .icon(icon_id)
            .cloned()
            .ok_or_else(|| StudioError::Props(format!("unknown icon {icon_id}")))?;

        let resource = self.loader.resolve(&icon.key).await;
        self.ensure_open()?;
        let object = SceneObject::new(ObjectKind::Icon {
            icon_id: icon.id.clone(),
            image: payload(&icon.key, &resource),
        })
        .with_name(format!("{ICON_PREFIX}{}", icon.id))
        .with_position(SEED_MARGIN, SEED_MARGIN);
        Ok(self.composer.add_object(object))
    }

    /// Remove every placed copy of icon `icon_id`.
    pub fn remove_icon(&mut self, icon_id: &str) -> usize {
        let name = format!("{ICON_PREFIX}{icon_id}");
        let removed = self.composer.remove_by_name(|n| n == name);
        self.release_unreferenced(removed.iter().filter_map(image_key));
        removed.len()
    }

    /// Place the business logo in the top-right corner.
    ///
    /// Returns `None` when the props carry no logo.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Closed`] after teardown.
    pub async fn add_logo(&mut self) -> StudioResult<Option<ObjectId>> {
        self.ensure_open()?;
        let Some(key) = self.props.presets.logo_key.clone() else {
            return Ok(None);
        };
        let resource = self.loader.resolve(&key).await;
        self.ensure_open()?;

        let mut logo =
            SceneObject::new(ObjectKind::Logo(payload(&key, &resource))).with_name(LOGO_TAG);
        let scale = (LOGO_MAX_EDGE / logo.width.max(logo.height)).min(1.0);
        let surface_width = f64::from(self.composer.scene().width());
        logo.transform = Transform {
            left: surface_width - SEED_MARGIN - logo.width * scale,
            top: SEED_MARGIN,
            scale_x: scale,
            scale_y: scale,
            angle: 0.0,
        };
        Ok(Some(self.composer.add_object(logo)))
    }

    /// Add the business-info preset strings as text objects.
    pub fn add_presets(&mut self) -> Vec<ObjectId> {
        let family = self
            .props
            .fonts
            .first()
            .cloned()
            .unwrap_or_else(|| TextStyle::default().font_family);
        let presets = &self.props.presets;
        let lines = [
            ("company", presets.company_name.clone(), 48.0),
            ("address", presets.address.clone(), 24.0),
            ("contact", presets.contact.clone(), 24.0),
        ];

        let mut top = SEED_MARGIN;
        let mut ids = Vec::new();
        for (tag, content, font_size) in lines {
            let Some(content) = content.filter(|c| !c.trim().is_empty()) else {
                continue;
            };
            let style = TextStyle {
                font_family: family.clone(),
                font_size,
                ..TextStyle::default()
            };
            let object = SceneObject::text(content, style)
                .with_name(format!("{PRESET_PREFIX}{tag}"))
                .with_position(SEED_MARGIN, top);
            top += object.height + SEED_MARGIN / 2.0;
            ids.push(self.composer.add_object(object));
        }
        ids
    }

    /// Seed the design from the host props: background, logo and presets.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Closed`] after teardown.
    pub async fn seed(&mut self) -> StudioResult<()> {
        self.init_background().await?;
        self.add_logo().await?;
        let presets = self.add_presets();
        tracing::info!(
            objects = self.composer.scene().len(),
            presets = presets.len(),
            "design seeded"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    /// Route an input event to the composer.
    ///
    /// Images no longer used by any object after the event are released.
    pub fn handle_event(&mut self, event: &InputEvent) -> Vec<SyncEffect> {
        let before = self.referenced_keys();
        let effects = self.composer.handle_event(event);
        self.release_unreferenced(before);
        effects
    }

    /// Change the font family of the active text object.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Props`] if the host offers fonts and `family`
    /// is not among them, or a canvas error if no text object is active.
    pub fn set_font(&mut self, family: &str) -> StudioResult<Vec<SyncEffect>> {
        if !self.props.fonts.is_empty() && !self.props.offers_font(family) {
            return Err(StudioError::Props(format!("font {family} is not offered")));
        }
        Ok(self
            .composer
            .apply_toolbar(&ToolbarChange::FontFamily(family.to_string()))?)
    }

    // ------------------------------------------------------------------
    // Export and teardown
    // ------------------------------------------------------------------

    /// Export the design and, if an uploader is configured, save it.
    ///
    /// A remote failure is reported in the returned report, not as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local export fails.
    pub async fn export_and_save(&self, title: &str) -> StudioResult<ExportReport> {
        let scene = self.composer.scene();
        let meta = DesignMeta::for_scene(title, scene);
        let report = export_and_save(
            &self.exporter,
            scene,
            self.loader.blobs(),
            self.uploader.as_deref(),
            &meta,
        )
        .await?;
        if let Some(callback) = &self.on_export_complete {
            callback(&report);
        }
        Ok(report)
    }

    /// Release every image handle and clear the surface.
    ///
    /// Loads still in flight are discarded when they finish. Returns the
    /// number of handles released.
    pub fn teardown(&mut self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.latest_background += 1;
        self.pending_background = None;
        let released = self.loader.teardown();
        self.composer.clear();
        tracing::info!(released, "studio torn down");
        released
    }

    fn ensure_open(&self) -> StudioResult<()> {
        if self.is_closed() {
            Err(StudioError::Closed)
        } else {
            Ok(())
        }
    }

    fn referenced_keys(&self) -> HashSet<String> {
        self.composer
            .scene()
            .objects()
            .filter_map(image_key)
            .collect()
    }

    fn release_unreferenced(&self, keys: impl IntoIterator<Item = String>) {
        let live = self.referenced_keys();
        for key in keys {
            if !live.contains(&key) && self.loader.release(&key) {
                tracing::debug!(key = %key, "released unused image");
            }
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Image payload for `key`, with no raster when the load failed.
fn payload(key: &str, resource: &ImageResource) -> ImagePayload {
    ImagePayload {
        key: key.to_string(),
        raster: resource.raster_ref(),
    }
}

fn image_key(object: &SceneObject) -> Option<String> {
    object.kind.image().map(|image| image.key.clone())
}
