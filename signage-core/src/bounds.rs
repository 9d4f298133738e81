//! Bounds constraint engine.
//!
//! Keeps every constrained object's transformed bounding rectangle inside
//! `[0, 0, width, height]` of its surface. Three corrections exist:
//!
//! - **rollback** restores the last valid [`TransformSnapshot`] verbatim,
//! - **scale-to-fit** shrinks both axes by the same factor,
//! - **move-inside** translates the minimum distance back inside.
//!
//! Rollback wins whenever a usable snapshot is offered and the policy allows
//! it; otherwise scale-to-fit (if needed) is followed by move-inside.

use crate::element::{SceneObject, TransformSnapshot};
use crate::geometry::Rect;

/// Which corrections the engine may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionPolicy {
    /// Restore the snapshot if one is valid, else fit.
    PreferRollback,
    /// Never roll back; scale and move only.
    FitOnly,
}

/// Outcome of a bounds check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// The object was already inside the surface.
    Noop,
    /// The snapshot transform was restored.
    RolledBack,
    /// The object was translated by `(dx, dy)`.
    Moved {
        /// Horizontal shift.
        dx: f64,
        /// Vertical shift.
        dy: f64,
    },
    /// Both scale axes were multiplied by `factor`, then translated.
    Scaled {
        /// Uniform shrink factor (`< 1`).
        factor: f64,
        /// Horizontal shift applied after scaling.
        dx: f64,
        /// Vertical shift applied after scaling.
        dy: f64,
    },
}

impl Correction {
    /// Whether anything changed.
    #[must_use]
    pub fn applied(&self) -> bool {
        !matches!(self, Self::Noop)
    }
}

/// Surface rectangle for a `width` x `height` drawing surface.
#[must_use]
pub fn surface_rect(width: u32, height: u32) -> Rect {
    Rect::new(0.0, 0.0, f64::from(width), f64::from(height))
}

/// Whether the object's bounding rectangle leaves the surface.
///
/// Unconstrained kinds (backgrounds) never violate.
#[must_use]
pub fn is_violated(object: &SceneObject, surface: &Rect) -> bool {
    object.kind.is_constrained() && !surface.contains_rect(&object.bounding_rect())
}

/// Check `object` against `surface` and correct it in place.
///
/// `snapshot` is the object's last valid transform, if any. It is only used
/// when `policy` is [`CorrectionPolicy::PreferRollback`] and restoring it
/// actually yields a valid state.
pub fn check_and_correct(
    object: &mut SceneObject,
    surface: &Rect,
    snapshot: Option<&TransformSnapshot>,
    policy: CorrectionPolicy,
) -> Correction {
    if !is_violated(object, surface) {
        return Correction::Noop;
    }

    if policy == CorrectionPolicy::PreferRollback {
        if let Some(snapshot) = snapshot {
            let current = object.transform;
            snapshot.restore(object);
            if !is_violated(object, surface) {
                tracing::debug!(object = %object.id, "bounds: rolled back to snapshot");
                return Correction::RolledBack;
            }
            object.transform = current;
        }
    }

    let factor = scale_to_fit(object, surface);
    let (dx, dy) = move_inside(object, surface);
    if factor < 1.0 {
        tracing::debug!(object = %object.id, factor, dx, dy, "bounds: scaled to fit");
        Correction::Scaled { factor, dx, dy }
    } else {
        tracing::debug!(object = %object.id, dx, dy, "bounds: moved inside");
        Correction::Moved { dx, dy }
    }
}

/// Shrink both scale axes by the same factor so the bounding rectangle fits.
///
/// Returns the factor applied (`1.0` when the object already fits). Scaling is
/// about the object's origin; call [`move_inside`] afterwards.
pub fn scale_to_fit(object: &mut SceneObject, surface: &Rect) -> f64 {
    let bounds = object.bounding_rect();
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return 1.0;
    }
    let factor = (surface.width / bounds.width)
        .min(surface.height / bounds.height)
        .min(1.0);
    if factor < 1.0 {
        object.transform.scale_x *= factor;
        object.transform.scale_y *= factor;
    }
    factor
}

/// Translate the object the minimum distance needed to sit inside `surface`.
///
/// Returns the applied `(dx, dy)`. When the object is larger than the
/// surface on an axis it is aligned to the surface's leading edge.
pub fn move_inside(object: &mut SceneObject, surface: &Rect) -> (f64, f64) {
    let bounds = object.bounding_rect();
    let dx = axis_shift(bounds.left, bounds.right(), surface.left, surface.right());
    let dy = axis_shift(bounds.top, bounds.bottom(), surface.top, surface.bottom());
    object.transform.left += dx;
    object.transform.top += dy;
    (dx, dy)
}

fn axis_shift(start: f64, end: f64, min: f64, max: f64) -> f64 {
    if start < min {
        min - start
    } else if end > max {
        (max - end).max(min - start)
    } else {
        0.0
    }
}
