//! On-screen display size of the drawing surface.
//!
//! The surface's pixel size is fixed; the size it is displayed at is not.
//! Listeners are told about display-size changes exactly once per change.

/// Listener invoked with the new display size.
pub type ResizeListener = Box<dyn Fn(f64, f64) + Send + Sync>;

/// Tracks the display size and notifies on change.
#[derive(Default)]
pub struct DisplayViewport {
    size: Option<(f64, f64)>,
    listener: Option<ResizeListener>,
}

impl std::fmt::Debug for DisplayViewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayViewport")
            .field("size", &self.size)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}

impl DisplayViewport {
    /// Create a viewport with no known display size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listener invoked on every actual size change.
    pub fn set_listener<F>(&mut self, listener: F)
    where
        F: Fn(f64, f64) + Send + Sync + 'static,
    {
        self.listener = Some(Box::new(listener));
    }

    /// Record the display size. Returns whether it changed.
    pub fn set_display_size(&mut self, width: f64, height: f64) -> bool {
        if self.size == Some((width, height)) {
            return false;
        }
        self.size = Some((width, height));
        if let Some(listener) = &self.listener {
            listener(width, height);
        }
        true
    }

    /// Current display size.
    #[must_use]
    pub fn display_size(&self) -> Option<(f64, f64)> {
        self.size
    }

    /// Ratio of display size to surface size, per axis.
    #[must_use]
    pub fn display_scale(&self, surface_width: u32, surface_height: u32) -> Option<(f64, f64)> {
        let (w, h) = self.size?;
        if surface_width == 0 || surface_height == 0 {
            return None;
        }
        Some((w / f64::from(surface_width), h / f64::from(surface_height)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_listener_fires_once_per_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut viewport = DisplayViewport::new();
        viewport.set_listener(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(viewport.set_display_size(400.0, 200.0));
        assert!(!viewport.set_display_size(400.0, 200.0));
        assert!(viewport.set_display_size(800.0, 400.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_display_scale() {
        let mut viewport = DisplayViewport::new();
        assert!(viewport.display_scale(800, 400).is_none());
        viewport.set_display_size(400.0, 200.0);
        assert_eq!(viewport.display_scale(800, 400), Some((0.5, 0.5)));
        assert!(viewport.display_scale(0, 400).is_none());
    }
}
