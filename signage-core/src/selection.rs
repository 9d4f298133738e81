//! Selection and text-edit synchronization.
//!
//! Bridges selection and edit-mode changes on the surface to the property
//! toolbar. Per text object the phases are:
//!
//! ```text
//! Idle ──select──▶ Selected ──double click──▶ Editing
//!  ▲                 │   ▲                      │
//!  └──── clear ──────┘   └──── commit / blur ───┘
//! ```
//!
//! The toolbar only exists while a text object is `Selected` or `Editing`
//! and is rebuilt from the object on every transition, so no values leak
//! across a selection change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{ObjectId, ObjectKind, SceneObject};
use crate::text::{FontStyle, FontWeight, MIN_FONT_SIZE};

/// Maximum gap between two pointer-downs on the same object that counts as
/// a double click.
pub const DOUBLE_CLICK_WINDOW_MS: u64 = 600;

/// Toolbar mirror of the active text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolbarState {
    /// Object the toolbar is bound to.
    pub object: ObjectId,
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
    /// Underline flag.
    pub underline: bool,
    /// Literal text content.
    pub text: String,
}

impl ToolbarState {
    /// Build toolbar state from a text object; `None` for other kinds.
    #[must_use]
    pub fn from_object(object: &SceneObject) -> Option<Self> {
        match &object.kind {
            ObjectKind::Text { content, style } => Some(Self {
                object: object.id,
                font_family: style.font_family.clone(),
                font_size: style.font_size,
                fill: style.fill.clone(),
                weight: style.weight,
                style: style.style,
                underline: style.underline,
                text: content.clone(),
            }),
            _ => None,
        }
    }
}

/// A single property edit made in the toolbar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property", content = "value", rename_all = "snake_case")]
pub enum ToolbarChange {
    /// Font family.
    FontFamily(String),
    /// Font size in pixels.
    FontSize(f64),
    /// Fill colour.
    Fill(String),
    /// Weight.
    Weight(FontWeight),
    /// Style.
    Style(FontStyle),
    /// Underline flag.
    Underline(bool),
    /// Literal text content.
    Text(String),
}

impl ToolbarChange {
    /// Apply this change to a text object.
    ///
    /// Returns `false` if the object is not text. The object's intrinsic size
    /// is recomputed so a following bounds pass sees current coordinates.
    pub fn apply(&self, object: &mut SceneObject) -> bool {
        let ObjectKind::Text { content, style } = &mut object.kind else {
            return false;
        };
        match self {
            Self::FontFamily(family) => style.font_family.clone_from(family),
            Self::FontSize(size) => style.font_size = size.max(MIN_FONT_SIZE),
            Self::Fill(fill) => style.fill.clone_from(fill),
            Self::Weight(weight) => style.weight = *weight,
            Self::Style(font_style) => style.style = *font_style,
            Self::Underline(underline) => style.underline = *underline,
            Self::Text(text) => content.clone_from(text),
        }
        object.refresh_size();
        true
    }
}

/// Edit phase of the synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditPhase {
    /// No text object active.
    #[default]
    Idle,
    /// A text object is selected.
    Selected(ObjectId),
    /// A text object is in native edit mode.
    Editing(ObjectId),
}

/// Observable consequence of a synchronizer transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    /// The toolbar must show this state (`None` clears it).
    ToolbarChanged(Option<ToolbarState>),
    /// The object entered edit mode with `selection` (char range) selected.
    EnterEditing {
        /// Edited object.
        object: ObjectId,
        /// Selected character range; select-all on entry.
        selection: (usize, usize),
    },
    /// The object left edit mode.
    ExitEditing {
        /// Previously edited object.
        object: ObjectId,
    },
}

/// Work the host must perform on its next paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// Focus the toolbar's text-content field for this object.
    FocusTextField(ObjectId),
}

/// Keeps toolbar state consistent with the active text object.
#[derive(Debug, Default)]
pub struct SelectionSync {
    phase: EditPhase,
    toolbar: Option<ToolbarState>,
    /// Last pointer-down per object, for double-click emulation.
    last_click: HashMap<ObjectId, u64>,
    deferred: Vec<DeferredAction>,
}

impl SelectionSync {
    /// Create an idle synchronizer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    /// Current toolbar state.
    #[must_use]
    pub fn toolbar(&self) -> Option<&ToolbarState> {
        self.toolbar.as_ref()
    }

    /// Whether `id` is in edit mode.
    #[must_use]
    pub fn is_editing(&self, id: ObjectId) -> bool {
        self.phase() == EditPhase::Editing(id)
    }

    /// Selection changed to `object` (or cleared with `None`).
    pub fn select(&mut self, object: Option<&SceneObject>) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        let target = object.filter(|o| o.is_text());

        match (self.phase(), target) {
            (EditPhase::Selected(current) | EditPhase::Editing(current), Some(o))
                if current == o.id =>
            {
                return effects;
            }
            (EditPhase::Editing(current), _) => {
                effects.push(SyncEffect::ExitEditing { object: current });
            }
            _ => {}
        }

        self.phase = target.map_or(EditPhase::Idle, |o| EditPhase::Selected(o.id));
        self.set_toolbar(target.and_then(ToolbarState::from_object), &mut effects);
        tracing::debug!(phase = ?self.phase(), "selection synchronized");
        effects
    }

    /// Pointer pressed on `object` at `timestamp_ms`.
    ///
    /// A second press on the same selected text object within
    /// [`DOUBLE_CLICK_WINDOW_MS`] enters edit mode.
    pub fn pointer_down(&mut self, object: &SceneObject, timestamp_ms: u64) -> Vec<SyncEffect> {
        let previous = self.last_click.insert(object.id, timestamp_ms);
        let was_selected = self.phase() == EditPhase::Selected(object.id);
        let mut effects = self.select(Some(object));

        let is_double = previous
            .is_some_and(|t| timestamp_ms.saturating_sub(t) <= DOUBLE_CLICK_WINDOW_MS);
        if was_selected && is_double {
            effects.extend(self.enter_editing(object));
        }
        effects
    }

    /// Native double-click on `object`.
    pub fn double_click(&mut self, object: &SceneObject) -> Vec<SyncEffect> {
        let mut effects = self.select(Some(object));
        effects.extend(self.enter_editing(object));
        effects
    }

    /// Content of the edited object changed inside its edit surface.
    ///
    /// Re-populates the toolbar without leaving edit mode.
    pub fn edit_input(&mut self, object: &SceneObject) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        if self.is_editing(object.id) {
            self.set_toolbar(ToolbarState::from_object(object), &mut effects);
        }
        effects
    }

    /// Leave edit mode (focus loss or explicit commit).
    pub fn commit(&mut self) -> Vec<SyncEffect> {
        match self.phase() {
            EditPhase::Editing(id) => {
                self.phase = EditPhase::Selected(id);
                tracing::debug!(object = %id, "edit committed");
                vec![SyncEffect::ExitEditing { object: id }]
            }
            _ => Vec::new(),
        }
    }

    /// Refresh the toolbar after the bound object changed.
    pub fn refresh(&mut self, object: &SceneObject) -> Vec<SyncEffect> {
        let mut effects = Vec::new();
        if self.toolbar.as_ref().is_some_and(|t| t.object == object.id) {
            self.set_toolbar(ToolbarState::from_object(object), &mut effects);
        }
        effects
    }

    /// Drop interaction history for a removed object.
    pub fn forget(&mut self, id: ObjectId) -> Vec<SyncEffect> {
        self.last_click.remove(&id);
        self.deferred
            .retain(|action| !matches!(action, DeferredAction::FocusTextField(o) if *o == id));
        match self.phase() {
            EditPhase::Selected(current) | EditPhase::Editing(current) if current == id => {
                self.select(None)
            }
            _ => Vec::new(),
        }
    }

    /// Drain actions deferred to the next paint.
    pub fn take_deferred(&mut self) -> Vec<DeferredAction> {
        std::mem::take(&mut self.deferred)
    }

    /// Number of objects with click history.
    #[must_use]
    pub fn tracked_clicks(&self) -> usize {
        self.last_click.len()
    }

    fn enter_editing(&mut self, object: &SceneObject) -> Vec<SyncEffect> {
        let ObjectKind::Text { content, .. } = &object.kind else {
            return Vec::new();
        };
        if self.is_editing(object.id) {
            return Vec::new();
        }
        self.phase = EditPhase::Editing(object.id);
        self.deferred.push(DeferredAction::FocusTextField(object.id));
        tracing::debug!(object = %object.id, "entered text edit mode");
        vec![SyncEffect::EnterEditing {
            object: object.id,
            selection: (0, content.chars().count()),
        }]
    }

    fn set_toolbar(&mut self, state: Option<ToolbarState>, effects: &mut Vec<SyncEffect>) {
        if self.toolbar != state {
            self.toolbar.clone_from(&state);
            effects.push(SyncEffect::ToolbarChanged(state));
        }
    }
}
