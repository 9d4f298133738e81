//! Scene objects - the placeable pieces of a signage design.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{rotate_about, Rect};
use crate::text::{self, TextStyle};

/// Name tag carried by background objects.
pub const BACKGROUND_TAG: &str = "background";

/// Name tag carried by the logo object.
pub const LOGO_TAG: &str = "logo";

/// Intrinsic size given to image objects whose raster failed to load.
pub const PLACEHOLDER_SIZE: f64 = 200.0;

/// Unique identifier for a scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Create a new unique object ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded raster that can be drawn, referenced by its local handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterRef {
    /// Process-local handle (e.g. a blob URL) owned by the asset loader.
    pub handle: String,
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
}

/// Image content of an image-bearing object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    /// Storage key the raster was resolved from.
    pub key: String,
    /// The resolved raster, or `None` when a placeholder must be drawn.
    pub raster: Option<RasterRef>,
}

impl ImagePayload {
    /// Natural size, falling back to the placeholder size.
    #[must_use]
    pub fn natural_size(&self) -> (f64, f64) {
        self.raster.as_ref().map_or((PLACEHOLDER_SIZE, PLACEHOLDER_SIZE), |r| {
            (f64::from(r.width), f64::from(r.height))
        })
    }
}

/// The type of content an object carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ObjectKind {
    /// Editable text.
    Text {
        /// Literal text content.
        content: String,
        /// Typographic attributes.
        style: TextStyle,
    },
    /// An uploaded or AI-generated image.
    Image(ImagePayload),
    /// A catalog icon.
    Icon {
        /// Catalog identifier.
        icon_id: String,
        /// Icon raster.
        image: ImagePayload,
    },
    /// The business logo.
    Logo(ImagePayload),
    /// Surface-covering background.
    Background(ImagePayload),
}

impl ObjectKind {
    /// Short lowercase label for logs and default names.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image(_) => "image",
            Self::Icon { .. } => "icon",
            Self::Logo(_) => LOGO_TAG,
            Self::Background(_) => BACKGROUND_TAG,
        }
    }

    /// Image payload for image-bearing kinds.
    #[must_use]
    pub fn image(&self) -> Option<&ImagePayload> {
        match self {
            Self::Text { .. } => None,
            Self::Image(image) | Self::Logo(image) | Self::Background(image) => Some(image),
            Self::Icon { image, .. } => Some(image),
        }
    }

    /// Whether objects of this kind are subject to the bounds invariant.
    #[must_use]
    pub fn is_constrained(&self) -> bool {
        !matches!(self, Self::Background(_))
    }
}

/// Position, scale and rotation of an object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// X origin in surface pixels.
    pub left: f64,
    /// Y origin in surface pixels.
    pub top: f64,
    /// Horizontal scale factor.
    pub scale_x: f64,
    /// Vertical scale factor.
    pub scale_y: f64,
    /// Rotation in degrees about the object's centre.
    pub angle: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
        }
    }
}

impl Transform {
    /// Transform at a position with unit scale and no rotation.
    #[must_use]
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            ..Self::default()
        }
    }
}

/// The last bounds-valid transform of an object, used for rollback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSnapshot(Transform);

impl TransformSnapshot {
    /// Capture the current transform of `object`.
    #[must_use]
    pub fn capture(object: &SceneObject) -> Self {
        Self(object.transform)
    }

    /// The captured transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.0
    }

    /// Restore the captured transform verbatim onto `object`.
    pub fn restore(&self, object: &mut SceneObject) {
        object.transform = self.0;
    }
}

/// A placeable object on the drawing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique identifier.
    pub id: ObjectId,
    /// Content payload.
    pub kind: ObjectKind,
    /// Lookup tag, e.g. `icon-42`. Not required to be unique.
    pub name: String,
    /// Position, scale and rotation.
    pub transform: Transform,
    /// Untransformed width in pixels.
    pub width: f64,
    /// Untransformed height in pixels.
    pub height: f64,
    /// Whether the user can select and manipulate the object.
    pub selectable: bool,
}

impl SceneObject {
    /// Create an object whose intrinsic size is derived from its content.
    #[must_use]
    pub fn new(kind: ObjectKind) -> Self {
        let name = kind.label().to_string();
        let selectable = kind.is_constrained();
        let mut object = Self {
            id: ObjectId::new(),
            kind,
            name,
            transform: Transform::default(),
            width: 0.0,
            height: 0.0,
            selectable,
        };
        object.refresh_size();
        object
    }

    /// Create a text object.
    #[must_use]
    pub fn text(content: impl Into<String>, style: TextStyle) -> Self {
        Self::new(ObjectKind::Text {
            content: content.into(),
            style,
        })
    }

    /// Set the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the position, keeping scale and rotation.
    #[must_use]
    pub fn with_position(mut self, left: f64, top: f64) -> Self {
        self.transform.left = left;
        self.transform.top = top;
        self
    }

    /// Set the lookup name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the intrinsic size.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Recompute the intrinsic size from content.
    ///
    /// Called whenever text content or style changes so the bounding
    /// rectangle used by the constraint engine is current.
    pub fn refresh_size(&mut self) {
        let (width, height) = match &self.kind {
            ObjectKind::Text { content, style } => text::measure(content, style),
            other => other
                .image()
                .map_or((PLACEHOLDER_SIZE, PLACEHOLDER_SIZE), ImagePayload::natural_size),
        };
        self.width = width;
        self.height = height;
    }

    /// Whether this object is editable text.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text { .. })
    }

    /// Scaled size before rotation.
    #[must_use]
    pub fn scaled_size(&self) -> (f64, f64) {
        (
            self.width * self.transform.scale_x,
            self.height * self.transform.scale_y,
        )
    }

    /// Corners of the transformed object in surface coordinates.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        let t = &self.transform;
        let (w, h) = self.scaled_size();
        let (cx, cy) = (t.left + w / 2.0, t.top + h / 2.0);
        [
            rotate_about(t.left, t.top, cx, cy, t.angle),
            rotate_about(t.left + w, t.top, cx, cy, t.angle),
            rotate_about(t.left + w, t.top + h, cx, cy, t.angle),
            rotate_about(t.left, t.top + h, cx, cy, t.angle),
        ]
    }

    /// Axis-aligned bounding rectangle under the current transform.
    #[must_use]
    pub fn bounding_rect(&self) -> Rect {
        if self.transform.angle.rem_euclid(360.0).abs() < f64::EPSILON {
            let (w, h) = self.scaled_size();
            return Rect::new(self.transform.left, self.transform.top, w, h);
        }
        Rect::hull(&self.corners())
    }

    /// Check if a point (in surface coordinates) lies on this object.
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let t = &self.transform;
        let (w, h) = self.scaled_size();
        let (cx, cy) = (t.left + w / 2.0, t.top + h / 2.0);
        let (lx, ly) = rotate_about(x, y, cx, cy, -t.angle);
        Rect::new(t.left, t.top, w, h).contains_point(lx, ly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(width: u32, height: u32) -> ImagePayload {
        ImagePayload {
            key: "assets/a.png".to_string(),
            raster: Some(RasterRef {
                handle: "blob:test/1".to_string(),
                width,
                height,
            }),
        }
    }

    #[test]
    fn test_image_size_comes_from_raster() {
        let object = SceneObject::new(ObjectKind::Image(image(320, 240)));
        assert!((object.width - 320.0).abs() < f64::EPSILON);
        assert!((object.height - 240.0).abs() < f64::EPSILON);
        assert_eq!(object.name, "image");
        assert!(object.selectable);
    }

    #[test]
    fn test_failed_raster_uses_placeholder_size() {
        let object = SceneObject::new(ObjectKind::Logo(ImagePayload {
            key: "logos/missing.png".to_string(),
            raster: None,
        }));
        assert!((object.width - PLACEHOLDER_SIZE).abs() < f64::EPSILON);
        assert_eq!(object.name, LOGO_TAG);
    }

    #[test]
    fn test_background_is_not_selectable() {
        let object = SceneObject::new(ObjectKind::Background(image(10, 10)));
        assert!(!object.selectable);
        assert!(!object.kind.is_constrained());
    }

    #[test]
    fn test_bounding_rect_unrotated() {
        let object = SceneObject::new(ObjectKind::Image(image(100, 60))).with_transform(
            Transform {
                left: 10.0,
                top: 20.0,
                scale_x: 2.0,
                scale_y: 0.5,
                angle: 0.0,
            },
        );
        let rect = object.bounding_rect();
        assert_eq!(rect, Rect::new(10.0, 20.0, 200.0, 30.0));
    }

    #[test]
    fn test_bounding_rect_quarter_turn_swaps_axes() {
        let object = SceneObject::new(ObjectKind::Image(image(100, 40))).with_transform(
            Transform {
                angle: 90.0,
                ..Transform::at(0.0, 0.0)
            },
        );
        let rect = object.bounding_rect();
        assert!((rect.width - 40.0).abs() < 1e-9);
        assert!((rect.height - 100.0).abs() < 1e-9);
        assert!((rect.left - 30.0).abs() < 1e-9);
        assert!((rect.top + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_contains_point_respects_rotation() {
        let object = SceneObject::new(ObjectKind::Image(image(100, 10))).with_transform(
            Transform {
                angle: 90.0,
                ..Transform::at(0.0, 0.0)
            },
        );
        // Centre is (50, 5); rotated bar spans y in [-45, 55] at x = 50.
        assert!(object.contains_point(50.0, 50.0));
        assert!(!object.contains_point(90.0, 5.0));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut object = SceneObject::new(ObjectKind::Image(image(10, 10)))
            .with_transform(Transform::at(5.0, 5.0));
        let snapshot = TransformSnapshot::capture(&object);
        object.transform.left = 99.0;
        snapshot.restore(&mut object);
        assert!((object.transform.left - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_refresh_size_tracks_content() {
        let mut object = SceneObject::text("Hi", TextStyle::default());
        let before = object.width;
        if let ObjectKind::Text { content, .. } = &mut object.kind {
            content.push_str(" there");
        }
        object.refresh_size();
        assert!(object.width > before);
    }
}
