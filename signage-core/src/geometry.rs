//! Rectangles and transformed bounds.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing float edges against the surface.
///
/// Bounds corrections move edges to exactly `0` or `width`; rotation math can
/// land a hair outside, which must not count as a violation.
pub const EDGE_EPSILON: f64 = 1e-6;

/// An axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Whether `other` lies fully inside this rectangle.
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left - EDGE_EPSILON
            && other.top >= self.top - EDGE_EPSILON
            && other.right() <= self.right() + EDGE_EPSILON
            && other.bottom() <= self.bottom() + EDGE_EPSILON
    }

    /// Whether a point lies inside this rectangle (edges inclusive).
    #[must_use]
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    /// Axis-aligned hull of the given corner points.
    #[must_use]
    pub fn hull(points: &[(f64, f64)]) -> Self {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if points.is_empty() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// Rotate `(x, y)` about `(cx, cy)` by `angle_degrees`.
#[must_use]
pub fn rotate_about(x: f64, y: f64, cx: f64, cy: f64, angle_degrees: f64) -> (f64, f64) {
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let dx = x - cx;
    let dy = y - cy;
    (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert!((r.right() - 110.0).abs() < f64::EPSILON);
        assert!((r.bottom() - 70.0).abs() < f64::EPSILON);
        assert_eq!(r.center(), (60.0, 45.0));
    }

    #[test]
    fn test_contains_rect_tolerates_float_noise() {
        let outer = Rect::new(0.0, 0.0, 800.0, 400.0);
        let inner = Rect::new(-1e-9, 0.0, 800.0 + 1e-9, 400.0);
        assert!(outer.contains_rect(&inner));

        let outside = Rect::new(-0.5, 0.0, 10.0, 10.0);
        assert!(!outer.contains_rect(&outside));
    }

    #[test]
    fn test_hull_of_rotated_square() {
        let corners = [
            rotate_about(0.0, 0.0, 50.0, 50.0, 45.0),
            rotate_about(100.0, 0.0, 50.0, 50.0, 45.0),
            rotate_about(100.0, 100.0, 50.0, 50.0, 45.0),
            rotate_about(0.0, 100.0, 50.0, 50.0, 45.0),
        ];
        let hull = Rect::hull(&corners);
        let diagonal = 100.0 * std::f64::consts::SQRT_2;
        assert!((hull.width - diagonal).abs() < 1e-9);
        assert!((hull.height - diagonal).abs() < 1e-9);
        let (cx, cy) = hull.center();
        assert!((cx - 50.0).abs() < 1e-9);
        assert!((cy - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_hull_empty() {
        let hull = Rect::hull(&[]);
        assert!(hull.width.abs() < f64::EPSILON);
    }
}
