//! The drawing surface and its object store.

use std::collections::HashMap;

use crate::bounds::{self, Correction, CorrectionPolicy};
use crate::element::{ObjectId, SceneObject, TransformSnapshot};
use crate::geometry::Rect;
use crate::{CanvasError, CanvasResult};

/// A fixed-size drawing surface holding the ordered list of scene objects.
///
/// Paint order is list order: index 0 is painted first. The active
/// reference is a lookup key only; removing the object clears it.
#[derive(Debug, Clone)]
pub struct Scene {
    width: u32,
    height: u32,
    objects: Vec<SceneObject>,
    active: Option<ObjectId>,
    /// Last bounds-valid transform per object.
    snapshots: HashMap<ObjectId, TransformSnapshot>,
}

impl Scene {
    /// Create an empty surface of the given pixel size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            objects: Vec::new(),
            active: None,
            snapshots: HashMap::new(),
        }
    }

    /// Surface width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The surface rectangle `[0, 0, width, height]`.
    #[must_use]
    pub fn surface_rect(&self) -> Rect {
        bounds::surface_rect(self.width, self.height)
    }

    /// Append an object.
    ///
    /// Constrained kinds are corrected before the object becomes visible, so
    /// no object is ever rendered out of bounds. Backgrounds are not
    /// appended: they go below all content and are never selectable. Use
    /// [`Scene::set_background`] to replace the current background.
    pub fn add(&mut self, mut object: SceneObject) -> ObjectId {
        let id = object.id;
        if !object.kind.is_constrained() {
            object.selectable = false;
            let floor = self.background_floor();
            tracing::debug!(object = %id, kind = object.kind.label(), "background added");
            self.objects.insert(floor, object);
            return id;
        }
        let surface = self.surface_rect();
        let correction =
            bounds::check_and_correct(&mut object, &surface, None, CorrectionPolicy::FitOnly);
        if correction.applied() {
            tracing::debug!(object = %id, ?correction, "corrected on insert");
        }
        self.snapshots.insert(id, TransformSnapshot::capture(&object));
        tracing::debug!(object = %id, kind = object.kind.label(), name = %object.name, "object added");
        self.objects.push(object);
        id
    }

    /// Remove an object by identity.
    ///
    /// Clears the active reference if it pointed at the object and discards
    /// the object's snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn remove(&mut self, id: ObjectId) -> CanvasResult<SceneObject> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
        if self.active == Some(id) {
            self.active = None;
        }
        self.snapshots.remove(&id);
        Ok(self.objects.remove(index))
    }

    /// Update the active reference.
    ///
    /// Returns the previously active object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found or is not selectable.
    pub fn set_active(&mut self, id: Option<ObjectId>) -> CanvasResult<Option<ObjectId>> {
        if let Some(id) = id {
            let object = self
                .get(id)
                .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
            if !object.selectable {
                return Err(CanvasError::InvalidOperation(format!(
                    "{} {id} is not selectable",
                    object.kind.label()
                )));
            }
        }
        Ok(std::mem::replace(&mut self.active, id))
    }

    /// The active object ID, if any.
    #[must_use]
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    /// The active object, if any.
    #[must_use]
    pub fn active_object(&self) -> Option<&SceneObject> {
        self.active.and_then(|id| self.get(id))
    }

    /// Get an object by ID.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Get a mutable reference to an object by ID.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// All objects in paint order.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// IDs of objects whose name matches `predicate`, in paint order.
    pub fn objects_by_name<P>(&self, predicate: P) -> Vec<ObjectId>
    where
        P: Fn(&str) -> bool,
    {
        self.objects
            .iter()
            .filter(|o| predicate(&o.name))
            .map(|o| o.id)
            .collect()
    }

    /// Topmost selectable object under a surface point.
    #[must_use]
    pub fn object_at(&self, x: f64, y: f64) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .find(|o| o.selectable && o.contains_point(x, y))
            .map(|o| o.id)
    }

    /// Replace every background object with `background`.
    ///
    /// The new background is scaled to cover the surface, centred, and placed
    /// at the bottom of the paint order. Returns the replaced backgrounds so
    /// their image handles can be released.
    pub fn set_background(&mut self, mut background: SceneObject) -> (ObjectId, Vec<SceneObject>) {
        let old: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|o| !o.kind.is_constrained())
            .map(|o| o.id)
            .collect();
        let removed = old
            .into_iter()
            .filter_map(|id| self.remove(id).ok())
            .collect::<Vec<_>>();

        cover_surface(&mut background, self.width, self.height);
        background.selectable = false;
        let id = background.id;
        self.objects.insert(0, background);
        tracing::debug!(object = %id, replaced = removed.len(), "background set");
        (id, removed)
    }

    /// Move an object to the top of the paint order.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found, or
    /// [`CanvasError::InvalidOperation`] for a background, which always
    /// stays lowest.
    pub fn bring_to_front(&mut self, id: ObjectId) -> CanvasResult<()> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
        if !self.objects[index].kind.is_constrained() {
            return Err(CanvasError::InvalidOperation(format!(
                "background {id} cannot be brought to front"
            )));
        }
        let object = self.objects.remove(index);
        self.objects.push(object);
        Ok(())
    }

    /// Move an object to the bottom of the paint order, above backgrounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn send_to_back(&mut self, id: ObjectId) -> CanvasResult<()> {
        let index = self
            .index_of(id)
            .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
        let object = self.objects.remove(index);
        let floor = self.background_floor();
        self.objects.insert(floor, object);
        Ok(())
    }

    /// Run the constraint engine on one object.
    ///
    /// A state that ends valid refreshes the object's snapshot; a rollback
    /// leaves the snapshot as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not found.
    pub fn check_bounds(&mut self, id: ObjectId, policy: CorrectionPolicy) -> CanvasResult<Correction> {
        let surface = self.surface_rect();
        let snapshot = self.snapshots.get(&id).copied();
        let object = self
            .objects
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| CanvasError::ObjectNotFound(id.to_string()))?;
        let correction = bounds::check_and_correct(object, &surface, snapshot.as_ref(), policy);
        if object.kind.is_constrained() && !bounds::is_violated(object, &surface) {
            self.snapshots.insert(id, TransformSnapshot::capture(object));
        }
        Ok(correction)
    }

    /// Record the object's current transform as its snapshot if it is valid.
    ///
    /// Returns whether a snapshot was recorded.
    pub fn record_snapshot(&mut self, id: ObjectId) -> bool {
        let surface = self.surface_rect();
        let snapshot = self
            .get(id)
            .filter(|o| o.kind.is_constrained() && !bounds::is_violated(o, &surface))
            .map(TransformSnapshot::capture);
        match snapshot {
            Some(snapshot) => {
                self.snapshots.insert(id, snapshot);
                true
            }
            None => false,
        }
    }

    /// The snapshot held for an object, if any.
    #[must_use]
    pub fn snapshot(&self, id: ObjectId) -> Option<&TransformSnapshot> {
        self.snapshots.get(&id)
    }

    /// Number of snapshots currently held.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Get the number of objects on the surface.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the surface is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Remove every object and drop the active reference and snapshots.
    ///
    /// Returns the removed objects.
    pub fn clear(&mut self) -> Vec<SceneObject> {
        self.active = None;
        self.snapshots.clear();
        std::mem::take(&mut self.objects)
    }

    /// Index of the first object above the backgrounds.
    fn background_floor(&self) -> usize {
        self.objects
            .iter()
            .take_while(|o| !o.kind.is_constrained())
            .count()
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }
}

/// Scale `object` to cover a `width` x `height` surface and centre it.
pub fn cover_surface(object: &mut SceneObject, width: u32, height: u32) {
    if object.width <= 0.0 || object.height <= 0.0 {
        return;
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let scale = (w / object.width).max(h / object.height);
    object.transform.scale_x = scale;
    object.transform.scale_y = scale;
    object.transform.angle = 0.0;
    object.transform.left = (w - object.width * scale) / 2.0;
    object.transform.top = (h - object.height * scale) / 2.0;
}
