//! Scene export to PNG and PDF.
//!
//! Renders a [`Scene`] through an SVG intermediate representation and the
//! resvg/tiny-skia rasterization pipeline at a supersampling multiplier, then
//! wraps the raster in an A4 PDF page.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use signage_assets::BlobRegistry;
use signage_core::text::LINE_HEIGHT;
use signage_core::{ObjectKind, Scene, SceneObject, TextStyle};

use crate::error::{RenderError, RenderResult};

/// A4 short edge in millimetres.
const A4_SHORT_MM: f32 = 210.0;
/// A4 long edge in millimetres.
const A4_LONG_MM: f32 = 297.0;

/// Encoded raster bytes ready to embed in the SVG.
#[derive(Debug, Clone)]
pub struct EmbeddedRaster {
    /// Encoded image bytes.
    pub bytes: Arc<[u8]>,
    /// MIME type of `bytes`.
    pub mime: &'static str,
}

/// Lookup from raster handles to encoded bytes.
pub trait RasterSource: Sync {
    /// Bytes behind `handle`, or `None` if it is not live.
    fn raster(&self, handle: &str) -> Option<EmbeddedRaster>;
}

impl RasterSource for BlobRegistry {
    fn raster(&self, handle: &str) -> Option<EmbeddedRaster> {
        self.get(handle).map(|blob| EmbeddedRaster {
            bytes: blob.bytes,
            mime: blob.format.mime(),
        })
    }
}

/// Configuration for scene export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Supersampling multiplier applied to the surface size (at least 2).
    pub supersample: f64,
    /// DPI used to convert raster pixels to page millimetres.
    pub dpi: f32,
    /// Margin around the image on the PDF page, in millimetres.
    pub page_margin_mm: f32,
    /// Background color as RGBA bytes.
    pub background: [u8; 4],
    /// Load system fonts for text rendering.
    pub system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            supersample: 2.0,
            dpi: 96.0,
            page_margin_mm: 10.0,
            background: [255, 255, 255, 255],
            system_fonts: true,
        }
    }
}

/// Output of a local export.
#[derive(Debug, Clone)]
pub struct ExportArtifacts {
    /// Supersampled PNG raster.
    pub png: Vec<u8>,
    /// PDF document embedding the raster.
    pub pdf: Vec<u8>,
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
}

impl ExportArtifacts {
    /// Write `<stem>.png` and `<stem>.pdf` into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or either file cannot be written.
    pub fn write_to(&self, dir: &Path, stem: &str) -> RenderResult<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let png_path = dir.join(format!("{stem}.png"));
        let pdf_path = dir.join(format!("{stem}.pdf"));
        std::fs::write(&png_path, &self.png)?;
        std::fs::write(&pdf_path, &self.pdf)?;
        Ok((png_path, pdf_path))
    }
}

/// Placement of the raster on the PDF page, in millimetres from the
/// bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Page width.
    pub page_width_mm: f32,
    /// Page height.
    pub page_height_mm: f32,
    /// Placed image width.
    pub image_width_mm: f32,
    /// Placed image height.
    pub image_height_mm: f32,
    /// Left edge of the image.
    pub x_mm: f32,
    /// Bottom edge of the image.
    pub y_mm: f32,
    /// Scale applied to the image's natural size at the configured DPI.
    pub scale: f32,
}

impl PageLayout {
    /// Lay out a `width` x `height` raster on an A4 page, landscape when the
    /// raster is wider than tall, fitted inside the margin and centred.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn for_raster(width: u32, height: u32, config: &ExportConfig) -> Self {
        let (page_width_mm, page_height_mm) = if width > height {
            (A4_LONG_MM, A4_SHORT_MM)
        } else {
            (A4_SHORT_MM, A4_LONG_MM)
        };
        let avail_w = (page_width_mm - 2.0 * config.page_margin_mm).max(1.0);
        let avail_h = (page_height_mm - 2.0 * config.page_margin_mm).max(1.0);

        let natural_w = width.max(1) as f32 / config.dpi * 25.4;
        let natural_h = height.max(1) as f32 / config.dpi * 25.4;
        let scale = (avail_w / natural_w).min(avail_h / natural_h);

        let image_width_mm = natural_w * scale;
        let image_height_mm = natural_h * scale;
        Self {
            page_width_mm,
            page_height_mm,
            image_width_mm,
            image_height_mm,
            x_mm: (page_width_mm - image_width_mm) / 2.0,
            y_mm: (page_height_mm - image_height_mm) / 2.0,
            scale,
        }
    }
}

/// Exports a [`Scene`] to a PNG raster and a PDF document.
pub struct SceneExporter {
    config: ExportConfig,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for SceneExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneExporter")
            .field("config", &self.config)
            .field("fonts", &self.fontdb.len())
            .finish()
    }
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    ///
    /// The supersampling multiplier is raised to 2 if configured lower.
    #[must_use]
    pub fn new(mut config: ExportConfig) -> Self {
        config.supersample = config.supersample.max(2.0);
        let mut fontdb = usvg::fontdb::Database::new();
        if config.system_fonts {
            fontdb.load_system_fonts();
        }
        tracing::debug!(fonts = fontdb.len(), "exporter font database ready");
        Self {
            config,
            fontdb: Arc::new(fontdb),
        }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Export configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Render the scene to PNG and wrap it in a PDF page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Export`] if rasterization or document
    /// generation fails.
    pub fn export(&self, scene: &Scene, rasters: &dyn RasterSource) -> RenderResult<ExportArtifacts> {
        let (png, width, height) = self.render_to_png(scene, rasters)?;
        let pdf = self.render_to_pdf(&png, width, height)?;
        tracing::info!(
            width,
            height,
            png_bytes = png.len(),
            pdf_bytes = pdf.len(),
            "design exported"
        );
        Ok(ExportArtifacts {
            png,
            pdf,
            width,
            height,
        })
    }

    /// Export the scene to supersampled PNG bytes.
    ///
    /// Returns the bytes and the raster's pixel size.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(
        &self,
        scene: &Scene,
        rasters: &dyn RasterSource,
    ) -> RenderResult<(Vec<u8>, u32, u32)> {
        let svg_string = self.render_to_svg(scene, rasters);
        let pixmap = self.rasterize_svg(&svg_string)?;
        let (width, height) = (pixmap.width(), pixmap.height());
        let png = pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;
        Ok((png, width, height))
    }

    /// Describe the scene as an SVG document in paint order.
    #[must_use]
    pub fn render_to_svg(&self, scene: &Scene, rasters: &dyn RasterSource) -> String {
        let (out_w, out_h) = self.output_dimensions(scene);
        let (view_w, view_h) = (scene.width(), scene.height());

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
        );

        // Background
        let bg = &self.config.background;
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"rgba({},{},{},{})\"/>",
            bg[0], bg[1], bg[2], bg_alpha,
        );

        for object in scene.objects() {
            render_object_svg(&mut svg, object, rasters);
        }

        svg.push_str("</svg>");
        svg
    }

    /// Wrap PNG bytes in an A4 PDF page.
    ///
    /// # Errors
    ///
    /// Returns an error if the PNG cannot be decoded or the PDF not saved.
    pub fn render_to_pdf(&self, png: &[u8], width: u32, height: u32) -> RenderResult<Vec<u8>> {
        let layout = PageLayout::for_raster(width, height, &self.config);

        let (doc, page1, layer1) = printpdf::PdfDocument::new(
            "Signage Design",
            printpdf::Mm(layout.page_width_mm),
            printpdf::Mm(layout.page_height_mm),
            "Design",
        );
        let current_layer = doc.get_page(page1).get_layer(layer1);

        // Decode PNG using printpdf's bundled image crate for compatibility
        let dynamic_image = printpdf::image_crate::load_from_memory(png)
            .map_err(|e| RenderError::Export(format!("Failed to decode PNG for PDF: {e}")))?;
        let pdf_image = printpdf::Image::from_dynamic_image(&dynamic_image);

        let transform = printpdf::ImageTransform {
            translate_x: Some(printpdf::Mm(layout.x_mm)),
            translate_y: Some(printpdf::Mm(layout.y_mm)),
            scale_x: Some(layout.scale),
            scale_y: Some(layout.scale),
            dpi: Some(self.config.dpi),
            ..Default::default()
        };
        pdf_image.add_to_layer(current_layer, transform);

        doc.save_to_bytes()
            .map_err(|e| RenderError::Export(format!("PDF save failed: {e}")))
    }

    /// Get supersampled output dimensions (width, height) in pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_dimensions(&self, scene: &Scene) -> (u32, u32) {
        let scale = self.config.supersample;
        let out_w = (f64::from(scene.width()) * scale).round() as u32;
        let out_h = (f64::from(scene.height()) * scale).round() as u32;
        (out_w.max(1), out_h.max(1))
    }

    /// Rasterize an SVG string to a tiny-skia Pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize_svg(&self, svg_string: &str) -> RenderResult<tiny_skia::Pixmap> {
        let opt = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(svg_string, &opt)
            .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().round() as u32;
        let px_h = tree.size().height().round() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Export("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

/// Render a single object to SVG in its own transformed frame.
fn render_object_svg(svg: &mut String, object: &SceneObject, rasters: &dyn RasterSource) {
    let tf = &object.transform;
    let (scaled_w, scaled_h) = object.scaled_size();
    let (cx, cy) = (tf.left + scaled_w / 2.0, tf.top + scaled_h / 2.0);
    let _ = write!(
        svg,
        "<g transform=\"translate({cx},{cy}) rotate({}) translate({},{}) scale({},{})\">",
        tf.angle,
        -scaled_w / 2.0,
        -scaled_h / 2.0,
        tf.scale_x,
        tf.scale_y,
    );

    match &object.kind {
        ObjectKind::Text { content, style } => render_text_svg(svg, content, style),
        kind => {
            let embedded = kind
                .image()
                .and_then(|image| image.raster.as_ref())
                .and_then(|raster| rasters.raster(&raster.handle));
            match embedded {
                Some(raster) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&raster.bytes);
                    let _ = write!(
                        svg,
                        "<image width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" href=\"data:{};base64,{encoded}\"/>",
                        object.width, object.height, raster.mime,
                    );
                }
                None => {
                    tracing::debug!(object = %object.id, "raster unavailable, drawing placeholder");
                    render_placeholder_svg(svg, object);
                }
            }
        }
    }

    svg.push_str("</g>");
}

/// Render multi-line text with its typographic attributes.
fn render_text_svg(svg: &mut String, content: &str, style: &TextStyle) {
    let size = style.font_size;
    let decoration = if style.underline { "underline" } else { "none" };
    let _ = write!(
        svg,
        "<text font-family=\"{}\" font-size=\"{size}\" fill=\"{}\" font-weight=\"{}\" font-style=\"{}\" text-decoration=\"{decoration}\">",
        escape_xml(&style.font_family),
        escape_xml(&style.fill),
        style.weight.as_css(),
        style.style.as_css(),
    );
    for (index, line) in content.split('\n').enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let baseline = size * (0.9 + LINE_HEIGHT * index as f64);
        let _ = write!(
            svg,
            "<tspan x=\"0\" y=\"{baseline}\">{}</tspan>",
            escape_xml(line)
        );
    }
    svg.push_str("</text>");
}

/// Grey box with a label, drawn wherever a raster is missing.
fn render_placeholder_svg(svg: &mut String, object: &SceneObject) {
    let (w, h) = (object.width, object.height);
    let _ = write!(
        svg,
        "<rect width=\"{w}\" height=\"{h}\" fill=\"#e0e0e0\" stroke=\"#999\" stroke-width=\"1\"/>",
    );
    let label = escape_xml(&object.name);
    let (center_x, center_y) = (w / 2.0, h / 2.0);
    let _ = write!(
        svg,
        "<text x=\"{center_x}\" y=\"{center_y}\" font-size=\"14\" fill=\"#666\" text-anchor=\"middle\" font-family=\"sans-serif\">{label}</text>",
    );
}

/// Escape special XML characters.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
