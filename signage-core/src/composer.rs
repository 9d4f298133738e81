//! Interactive composition session.
//!
//! Owns the [`Scene`] and the [`SelectionSync`] and routes input events
//! through the bounds engine and the synchronizer. Every event is handled
//! synchronously: a gesture observes one atomic before/after state.

use crate::bounds::CorrectionPolicy;
use crate::element::{ObjectId, SceneObject};
use crate::event::{InputEvent, Manipulation};
use crate::scene::Scene;
use crate::selection::{DeferredAction, EditPhase, SelectionSync, SyncEffect, ToolbarChange, ToolbarState};
use crate::viewport::DisplayViewport;
use crate::{CanvasError, CanvasResult};

/// Callback invoked when the active object changes.
pub type SelectionListener = Box<dyn Fn(Option<ObjectId>) + Send + Sync>;

/// Callback invoked after an object is removed.
pub type RemovalListener = Box<dyn Fn(&SceneObject) + Send + Sync>;

/// An in-progress pointer gesture on one object.
#[derive(Debug, Clone, Copy)]
struct Gesture {
    object: ObjectId,
    last_x: f64,
    last_y: f64,
}

/// A composition session over one drawing surface.
pub struct Composer {
    scene: Scene,
    sync: SelectionSync,
    viewport: DisplayViewport,
    gesture: Option<Gesture>,
    on_selection_changed: Option<SelectionListener>,
    on_object_removed: Option<RemovalListener>,
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("scene", &self.scene)
            .field("sync", &self.sync)
            .field("gesture", &self.gesture)
            .finish_non_exhaustive()
    }
}

impl Composer {
    /// Create a session over an empty `width` x `height` surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            scene: Scene::new(width, height),
            sync: SelectionSync::new(),
            viewport: DisplayViewport::new(),
            gesture: None,
            on_selection_changed: None,
            on_object_removed: None,
        }
    }

    /// Set the callback invoked when the active object changes.
    pub fn set_on_selection_changed<F>(&mut self, callback: F)
    where
        F: Fn(Option<ObjectId>) + Send + Sync + 'static,
    {
        self.on_selection_changed = Some(Box::new(callback));
    }

    /// Set the callback invoked after an object is removed.
    pub fn set_on_object_removed<F>(&mut self, callback: F)
    where
        F: Fn(&SceneObject) + Send + Sync + 'static,
    {
        self.on_object_removed = Some(Box::new(callback));
    }

    /// The scene.
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The display viewport.
    #[must_use]
    pub fn viewport(&self) -> &DisplayViewport {
        &self.viewport
    }

    /// Mutable access to the display viewport.
    pub fn viewport_mut(&mut self) -> &mut DisplayViewport {
        &mut self.viewport
    }

    /// Current edit phase.
    #[must_use]
    pub fn phase(&self) -> EditPhase {
        self.sync.phase()
    }

    /// Current toolbar state.
    #[must_use]
    pub fn toolbar(&self) -> Option<&ToolbarState> {
        self.sync.toolbar()
    }

    /// Add an object; it is bounds-corrected before it becomes visible.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.scene.add(object)
    }

    /// Replace the background. Returns the new ID and the replaced objects.
    pub fn set_background(&mut self, background: SceneObject) -> (ObjectId, Vec<SceneObject>) {
        self.scene.set_background(background)
    }

    /// Remove an object by identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn remove_object(&mut self, id: ObjectId) -> CanvasResult<(SceneObject, Vec<SyncEffect>)> {
        let was_active = self.scene.active() == Some(id);
        let object = self.scene.remove(id)?;
        if self.gesture.is_some_and(|g| g.object == id) {
            self.gesture = None;
        }
        let effects = self.sync.forget(id);
        if was_active {
            self.notify_selection(None);
        }
        if let Some(callback) = &self.on_object_removed {
            callback(&object);
        }
        tracing::debug!(object = %id, kind = object.kind.label(), "object removed");
        Ok((object, effects))
    }

    /// Remove every object whose name matches `predicate`.
    pub fn remove_by_name<P>(&mut self, predicate: P) -> Vec<SceneObject>
    where
        P: Fn(&str) -> bool,
    {
        self.scene
            .objects_by_name(predicate)
            .into_iter()
            .filter_map(|id| self.remove_object(id).ok().map(|(object, _)| object))
            .collect()
    }

    /// Move an object to the top of the paint order.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn bring_to_front(&mut self, id: ObjectId) -> CanvasResult<()> {
        self.scene.bring_to_front(id)
    }

    /// Move an object just above the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn send_to_back(&mut self, id: ObjectId) -> CanvasResult<()> {
        self.scene.send_to_back(id)
    }

    /// Drop every object and all interaction state. Returns the removed objects.
    pub fn clear(&mut self) -> Vec<SceneObject> {
        let had_active = self.scene.active().is_some();
        self.gesture = None;
        self.sync = SelectionSync::new();
        let removed = self.scene.clear();
        if had_active {
            self.notify_selection(None);
        }
        removed
    }

    /// Programmatically select an object (or clear with `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if the object is missing or not selectable.
    pub fn select(&mut self, id: Option<ObjectId>) -> CanvasResult<Vec<SyncEffect>> {
        let previous = self.scene.set_active(id)?;
        let object = id.and_then(|id| self.scene.get(id));
        let effects = self.sync.select(object);
        if previous != id {
            self.notify_selection(id);
        }
        Ok(effects)
    }

    /// Apply a toolbar edit to the active text object.
    ///
    /// The change is applied immediately, the object's size recomputed and
    /// a bounds pass run, since font growth can push text off the surface
    /// without any pointer gesture.
    ///
    /// # Errors
    ///
    /// Returns an error if no text object is bound to the toolbar.
    pub fn apply_toolbar(&mut self, change: &ToolbarChange) -> CanvasResult<Vec<SyncEffect>> {
        let id = self
            .sync
            .toolbar()
            .map(|t| t.object)
            .ok_or_else(|| CanvasError::InvalidOperation("no text object is active".into()))?;
        let object = self
            .scene
            .get_mut(id)
            .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
        if !change.apply(object) {
            return Err(CanvasError::InvalidOperation(format!("{id} is not text")));
        }
        self.scene.check_bounds(id, CorrectionPolicy::FitOnly)?;
        Ok(self.refresh_toolbar(id))
    }

    /// Drain work deferred to the next paint (e.g. focusing the text field).
    pub fn on_paint(&mut self) -> Vec<DeferredAction> {
        self.sync.take_deferred()
    }

    /// Handle one input event.
    pub fn handle_event(&mut self, event: &InputEvent) -> Vec<SyncEffect> {
        match event {
            InputEvent::PointerDown { x, y, timestamp_ms } => {
                self.pointer_down(*x, *y, *timestamp_ms)
            }
            InputEvent::PointerMove { x, y } => {
                self.pointer_move(*x, *y);
                Vec::new()
            }
            InputEvent::PointerUp { .. } => {
                self.finish_gesture();
                Vec::new()
            }
            InputEvent::DoubleClick { x, y } => self.double_click(*x, *y),
            InputEvent::Manipulate(manipulation) => {
                self.manipulate(*manipulation);
                Vec::new()
            }
            InputEvent::Key { key, pressed, .. } if *pressed => self.key(key),
            InputEvent::Key { .. } => Vec::new(),
            InputEvent::TextEdited { content } => self.text_edited(content),
            InputEvent::EditFocusLost => self.sync.commit(),
        }
    }

    fn pointer_down(&mut self, x: f64, y: f64, timestamp_ms: u64) -> Vec<SyncEffect> {
        self.finish_gesture();
        let Some(id) = self.scene.object_at(x, y) else {
            return self.select(None).unwrap_or_default();
        };
        if self.sync.is_editing(id) {
            return Vec::new();
        }

        // The synchronizer decides whether this press selects or enters edit
        // mode, so only the scene's active reference is updated here.
        if self.scene.active() != Some(id) {
            if let Err(e) = self.scene.set_active(Some(id)) {
                tracing::warn!("pointer down on unselectable object: {e}");
                return Vec::new();
            }
            self.notify_selection(Some(id));
        }
        let effects = match self.scene.get(id) {
            Some(object) => self.sync.pointer_down(object, timestamp_ms),
            None => Vec::new(),
        };
        if !self.sync.is_editing(id) {
            self.scene.record_snapshot(id);
            self.gesture = Some(Gesture {
                object: id,
                last_x: x,
                last_y: y,
            });
        }
        effects
    }

    fn pointer_move(&mut self, x: f64, y: f64) {
        let Some(gesture) = self.gesture.as_mut() else {
            return;
        };
        let (dx, dy) = (x - gesture.last_x, y - gesture.last_y);
        gesture.last_x = x;
        gesture.last_y = y;
        let id = gesture.object;
        if let Some(object) = self.scene.get_mut(id) {
            object.transform.left += dx;
            object.transform.top += dy;
        }
        self.live_check(id);
    }

    fn manipulate(&mut self, manipulation: Manipulation) {
        let Some(id) = self.scene.active() else {
            return;
        };
        let in_gesture = self.gesture.is_some_and(|g| g.object == id);
        if !in_gesture {
            self.scene.record_snapshot(id);
        }
        if let Some(object) = self.scene.get_mut(id) {
            match manipulation {
                Manipulation::Scale { scale_x, scale_y } => {
                    object.transform.scale_x = scale_x.max(0.0);
                    object.transform.scale_y = scale_y.max(0.0);
                }
                Manipulation::Rotate { angle } => object.transform.angle = angle,
            }
        }
        self.live_check(id);
        if !in_gesture {
            self.complete(id);
        }
    }

    fn double_click(&mut self, x: f64, y: f64) -> Vec<SyncEffect> {
        self.finish_gesture();
        let Some(id) = self.scene.object_at(x, y) else {
            return Vec::new();
        };
        let mut effects = match self.select(Some(id)) {
            Ok(effects) => effects,
            Err(e) => {
                tracing::warn!("double click on unselectable object: {e}");
                return Vec::new();
            }
        };
        if let Some(object) = self.scene.get(id) {
            effects.extend(self.sync.double_click(object));
        }
        effects
    }

    fn key(&mut self, key: &str) -> Vec<SyncEffect> {
        match key {
            "Delete" | "Backspace" => {
                let Some(id) = self.scene.active() else {
                    return Vec::new();
                };
                if self.sync.is_editing(id) {
                    return Vec::new();
                }
                self.remove_object(id)
                    .map(|(_, effects)| effects)
                    .unwrap_or_default()
            }
            "Escape" => match self.sync.phase() {
                EditPhase::Editing(_) => self.sync.commit(),
                _ => self.select(None).unwrap_or_default(),
            },
            _ => Vec::new(),
        }
    }

    fn text_edited(&mut self, content: &str) -> Vec<SyncEffect> {
        let EditPhase::Editing(id) = self.sync.phase() else {
            return Vec::new();
        };
        let Some(object) = self.scene.get_mut(id) else {
            return Vec::new();
        };
        ToolbarChange::Text(content.to_string()).apply(object);
        if let Err(e) = self.scene.check_bounds(id, CorrectionPolicy::FitOnly) {
            tracing::warn!("bounds pass after edit failed: {e}");
        }
        match self.scene.get(id) {
            Some(object) => self.sync.edit_input(object),
            None => Vec::new(),
        }
    }

    /// Correct a live gesture step, preferring rollback to the last valid
    /// transform so the object does not visibly snap.
    fn live_check(&mut self, id: ObjectId) {
        if let Err(e) = self.scene.check_bounds(id, CorrectionPolicy::PreferRollback) {
            tracing::warn!("live bounds check failed: {e}");
        }
    }

    fn finish_gesture(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            self.complete(gesture.object);
        }
    }

    fn complete(&mut self, id: ObjectId) {
        match self.scene.check_bounds(id, CorrectionPolicy::PreferRollback) {
            Ok(correction) if correction.applied() => {
                tracing::debug!(object = %id, ?correction, "gesture corrected");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("bounds check at gesture end failed: {e}"),
        }
    }

    fn refresh_toolbar(&mut self, id: ObjectId) -> Vec<SyncEffect> {
        match self.scene.get(id) {
            Some(object) => self.sync.refresh(object),
            None => Vec::new(),
        }
    }

    fn notify_selection(&self, id: Option<ObjectId>) {
        if let Some(callback) = &self.on_selection_changed {
            callback(id);
        }
    }
}
