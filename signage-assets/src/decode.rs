//! Image validation and PNG encoding.
//!
//! A fetched payload only counts as loaded once it actually decodes; bytes
//! that merely arrived are not enough.

use std::io::Cursor;
use std::time::Duration;

use crate::error::{AssetError, AssetResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF.
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            "image/gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // GIF: GIF8
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }

    /// MIME type used when the raster is embedded in a data URI.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Facts learned from a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Detected container format.
    pub format: ImageFormat,
}

/// Decode `data` fully to prove it is a renderable image.
///
/// # Errors
///
/// Returns [`AssetError::Decode`] if the bytes are not a decodable image or
/// decode to an empty raster.
pub fn validate_bytes(data: &[u8]) -> AssetResult<DecodedInfo> {
    let format = ImageFormat::from_magic_bytes(data);
    let img = image::load_from_memory(data)
        .map_err(|e| AssetError::Decode(format!("failed to decode image: {e}")))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(AssetError::Decode("image has no pixels".to_string()));
    }
    Ok(DecodedInfo {
        width,
        height,
        format,
    })
}

/// Validate `data` off the async thread, bounded by `timeout`.
///
/// The bytes are handed back on success so the caller can keep them.
///
/// # Errors
///
/// Returns [`AssetError::Timeout`] if decoding takes longer than `timeout`,
/// or [`AssetError::Decode`] if the payload does not decode.
pub async fn validate_with_timeout(
    data: Vec<u8>,
    timeout: Duration,
) -> AssetResult<(Vec<u8>, DecodedInfo)> {
    let task = tokio::task::spawn_blocking(move || validate_bytes(&data).map(|info| (data, info)));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join)) => Err(AssetError::Decode(format!("decode task failed: {join}"))),
        Err(_) => Err(AssetError::Timeout {
            stage: "validation",
            millis: timeout.as_millis(),
        }),
    }
}

/// Encode an RGBA raster as PNG bytes.
///
/// # Errors
///
/// Returns [`AssetError::Decode`] if encoding fails.
pub fn encode_png(img: &image::RgbaImage) -> AssetResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| AssetError::Decode(format!("failed to encode PNG: {e}")))?;
    Ok(buffer.into_inner())
}
