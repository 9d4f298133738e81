//! Input events for surface interaction.

use serde::{Deserialize, Serialize};

/// A handle-driven manipulation of the active object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Manipulation {
    /// Set absolute scale factors (corner/edge handle drag).
    Scale {
        /// New horizontal scale.
        scale_x: f64,
        /// New vertical scale.
        scale_y: f64,
    },
    /// Set an absolute rotation in degrees (rotation handle drag).
    Rotate {
        /// New angle in degrees.
        angle: f64,
    },
}

/// All input events the surface can receive.
///
/// Coordinates are in surface pixels. Timestamps are milliseconds on any
/// monotonic clock the host uses consistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Primary button pressed.
    PointerDown {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
        /// Event time in milliseconds.
        timestamp_ms: u64,
    },

    /// Pointer moved (drags the active object while a gesture is live).
    PointerMove {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// Primary button released; completes the gesture.
    PointerUp {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// Native double-click.
    DoubleClick {
        /// X coordinate.
        x: f64,
        /// Y coordinate.
        y: f64,
    },

    /// Live scale/rotate step from a transform handle.
    Manipulate(Manipulation),

    /// Keyboard event.
    Key {
        /// Key name, e.g. `Delete`, `Escape`.
        key: String,
        /// Whether the key is pressed.
        pressed: bool,
        /// Active modifier keys.
        modifiers: KeyModifiers,
    },

    /// Content changed inside the object's native edit surface.
    TextEdited {
        /// Full new text content.
        content: String,
    },

    /// The native edit surface lost focus.
    EditFocusLost,
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

impl InputEvent {
    /// Convenience constructor for a key press without modifiers.
    #[must_use]
    pub fn key_press(key: impl Into<String>) -> Self {
        Self::Key {
            key: key.into(),
            pressed: true,
            modifiers: KeyModifiers::default(),
        }
    }
}
