//! Drawing surface: the mutable scene the editor works on.
//!
//! Every structural change (add, modify, remove) queues a [`SurfaceEvent`].
//! Whoever owns the surface drains the queue with [`Surface::take_events`];
//! in the editor that is the history manager, which turns each event into
//! a snapshot unless a replay is in progress.

use crate::shapes::{Image, Shape, ShapeId, SerializableColor};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default canvas width (16:9 at the editor's maximum width).
pub const DEFAULT_WIDTH: f64 = 800.0;
/// Default canvas height.
pub const DEFAULT_HEIGHT: f64 = 450.0;

/// Structural mutation reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Added(ShapeId),
    Modified(ShapeId),
    Removed(ShapeId),
}

impl SurfaceEvent {
    pub fn shape_id(&self) -> ShapeId {
        match *self {
            SurfaceEvent::Added(id) | SurfaceEvent::Modified(id) | SurfaceEvent::Removed(id) => id,
        }
    }
}

/// The serializable part of the surface: objects plus canvas properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDocument {
    /// Objects in z-order (back to front).
    pub objects: Vec<Shape>,
    /// Canvas background color.
    pub background_color: SerializableColor,
    /// Canvas width in CSS pixels.
    pub width: f64,
    /// Canvas height in CSS pixels.
    pub height: f64,
}

impl Default for SurfaceDocument {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            background_color: SerializableColor::new(0xf5, 0xf5, 0xf5, 255),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl SurfaceDocument {
    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Runtime surface state. Selection and the event queue are not persisted.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    document: SurfaceDocument,
    selection: Option<ShapeId>,
    pending: Vec<SurfaceEvent>,
    needs_render: bool,
}

impl Surface {
    /// Create an empty surface.
    pub fn new(width: f64, height: f64, background_color: SerializableColor) -> Self {
        Self {
            document: SurfaceDocument {
                objects: Vec::new(),
                background_color,
                width,
                height,
            },
            ..Self::default()
        }
    }

    pub fn document(&self) -> &SurfaceDocument {
        &self.document
    }

    pub fn width(&self) -> f64 {
        self.document.width
    }

    pub fn height(&self) -> f64 {
        self.document.height
    }

    pub fn background_color(&self) -> SerializableColor {
        self.document.background_color
    }

    /// Change the canvas dimensions. Not a structural change.
    pub fn set_dimensions(&mut self, width: f64, height: f64) {
        self.document.width = width;
        self.document.height = height;
        self.needs_render = true;
    }

    /// Add a shape on top of the stack.
    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.document.objects.push(shape);
        self.pending.push(SurfaceEvent::Added(id));
        self.needs_render = true;
        id
    }

    /// Remove a shape.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let pos = self.position(id)?;
        let shape = self.document.objects.remove(pos);
        if self.selection == Some(id) {
            self.selection = None;
        }
        self.pending.push(SurfaceEvent::Removed(id));
        self.needs_render = true;
        Some(shape)
    }

    /// Mutate a shape in place. Returns false if the shape doesn't exist.
    pub fn modify(&mut self, id: ShapeId, f: impl FnOnce(&mut Shape)) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        f(&mut self.document.objects[pos]);
        self.pending.push(SurfaceEvent::Modified(id));
        self.needs_render = true;
        true
    }

    /// Mutate a shape without reporting a structural change.
    /// Layout adjustments (canvas resize) go through here.
    pub fn update_silently(&mut self, id: ShapeId, f: impl FnOnce(&mut Shape)) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        f(&mut self.document.objects[pos]);
        self.needs_render = true;
        true
    }

    /// Remove every object, emitting one removal per object.
    pub fn clear(&mut self) {
        for shape in std::mem::take(&mut self.document.objects) {
            self.pending.push(SurfaceEvent::Removed(shape.id()));
        }
        self.selection = None;
        self.needs_render = true;
    }

    /// Replace the whole content with a serialized document.
    ///
    /// The JSON is parsed before anything is touched, so a corrupt document
    /// leaves the surface as it was. On success the old objects are removed
    /// and the restored ones added, each emitting its event.
    pub fn load_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let restored = SurfaceDocument::from_json(json)?;
        self.clear();
        self.document.background_color = restored.background_color;
        self.document.width = restored.width;
        self.document.height = restored.height;
        for shape in restored.objects {
            self.add(shape);
        }
        Ok(())
    }

    /// Serialize the current document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.document.to_json()
    }

    /// Drain queued structural events, oldest first.
    pub fn take_events(&mut self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Whether any structural events are waiting to be drained.
    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Ask for a re-render on the next frame.
    pub fn request_render(&mut self) {
        self.needs_render = true;
    }

    /// Consume the pending render request.
    pub fn take_render_request(&mut self) -> bool {
        std::mem::take(&mut self.needs_render)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.document.objects.iter().find(|s| s.id() == id)
    }

    fn position(&self, id: ShapeId) -> Option<usize> {
        self.document.objects.iter().position(|s| s.id() == id)
    }

    /// Objects in z-order (back to front).
    pub fn objects(&self) -> &[Shape] {
        &self.document.objects
    }

    /// First raster image in z-order.
    pub fn first_image(&self) -> Option<&Image> {
        self.document.objects.iter().find_map(Shape::as_image)
    }

    /// Find the topmost shape at a point.
    pub fn shape_at_point(&self, point: Point, tolerance: f64) -> Option<ShapeId> {
        self.document
            .objects
            .iter()
            .rev()
            .find(|s| s.hit_test(point, tolerance))
            .map(Shape::id)
    }

    pub fn len(&self) -> usize {
        self.document.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.objects.is_empty()
    }

    /// Make a shape the active object.
    pub fn select(&mut self, id: ShapeId) -> bool {
        if self.get(id).is_some() {
            self.selection = Some(id);
            self.needs_render = true;
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.needs_render = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Rectangle, ShapeTrait, Text};

    fn rect_at(x: f64) -> Shape {
        Shape::Rectangle(Rectangle::new(Point::new(x, 0.0), 10.0, 10.0))
    }

    #[test]
    fn test_add_emits_event() {
        let mut surface = Surface::default();
        let id = surface.add(rect_at(0.0));
        assert_eq!(surface.take_events(), vec![SurfaceEvent::Added(id)]);
        assert!(surface.take_events().is_empty());
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut surface = Surface::default();
        let id = surface.add(rect_at(0.0));
        surface.select(id);
        assert!(surface.remove(id).is_some());
        assert_eq!(surface.selected(), None);
        assert_eq!(
            surface.take_events(),
            vec![SurfaceEvent::Added(id), SurfaceEvent::Removed(id)]
        );
    }

    #[test]
    fn test_modify_missing_shape() {
        let mut surface = Surface::default();
        assert!(!surface.modify(uuid::Uuid::new_v4(), |_| {}));
        assert!(!surface.has_pending_events());
    }

    #[test]
    fn test_load_json_replaces_content() {
        let mut source = Surface::default();
        let text = Text::new(Point::new(1.0, 2.0), "hi".to_string());
        let text_id = text.id();
        source.add(Shape::Text(text));
        let json = source.to_json().unwrap();

        let mut target = Surface::default();
        let old = target.add(rect_at(5.0));
        target.take_events();

        target.load_json(&json).unwrap();
        assert_eq!(target.document(), source.document());
        assert_eq!(
            target.take_events(),
            vec![SurfaceEvent::Removed(old), SurfaceEvent::Added(text_id)]
        );
    }

    #[test]
    fn test_load_corrupt_json_is_untouched() {
        let mut surface = Surface::default();
        surface.add(rect_at(5.0));
        surface.take_events();
        let before = surface.document().clone();

        assert!(surface.load_json("{\"objects\": [oops").is_err());
        assert_eq!(surface.document(), &before);
        assert!(!surface.has_pending_events());
    }

    #[test]
    fn test_shape_at_point_prefers_topmost() {
        let mut surface = Surface::default();
        let style = crate::shapes::ShapeStyle::filled(
            SerializableColor::white(),
            SerializableColor::black(),
            1.0,
        );
        let back = Rectangle::new(Point::ZERO, 100.0, 100.0).with_style(style.clone());
        let front = Rectangle::new(Point::ZERO, 100.0, 100.0).with_style(style);
        let front_id = front.id();
        surface.add(Shape::Rectangle(back));
        surface.add(Shape::Rectangle(front));
        assert_eq!(surface.shape_at_point(Point::new(50.0, 50.0), 0.0), Some(front_id));
    }
}
