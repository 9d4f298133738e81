//! Text styling and size estimation for text objects.

use serde::{Deserialize, Serialize};

/// Line height multiplier applied to the font size.
pub const LINE_HEIGHT: f64 = 1.16;

/// Average glyph advance relative to the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Extra advance for bold faces.
const BOLD_WIDENING: f64 = 1.08;

/// Smallest font size a text object may carry.
pub const MIN_FONT_SIZE: f64 = 1.0;

/// Font weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

impl FontWeight {
    /// CSS/SVG keyword for this weight.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
        }
    }
}

/// Font style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright.
    #[default]
    Normal,
    /// Italic.
    Italic,
}

impl FontStyle {
    /// CSS/SVG keyword for this style.
    #[must_use]
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Italic => "italic",
        }
    }
}

/// Typographic attributes of a text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Fill colour as hex.
    pub fill: String,
    /// Weight.
    pub weight: FontWeight,
    /// Style.
    pub style: FontStyle,
    /// Whether the text is underlined.
    pub underline: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 40.0,
            fill: "#000000".to_string(),
            weight: FontWeight::Normal,
            style: FontStyle::Normal,
            underline: false,
        }
    }
}

/// Estimate the untransformed size of `content` rendered with `style`.
///
/// There is no font engine in the core, so width is derived from the longest
/// line and an average glyph advance. Empty text still occupies one line so
/// the object stays selectable.
#[must_use]
pub fn measure(content: &str, style: &TextStyle) -> (f64, f64) {
    let size = style.font_size.max(MIN_FONT_SIZE);
    let lines: Vec<&str> = content.split('\n').collect();
    #[allow(clippy::cast_precision_loss)]
    let longest = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let mut advance = size * GLYPH_ADVANCE;
    if style.weight == FontWeight::Bold {
        advance *= BOLD_WIDENING;
    }
    #[allow(clippy::cast_precision_loss)]
    let line_count = lines.len().max(1) as f64;
    (longest * advance, line_count * size * LINE_HEIGHT)
}
