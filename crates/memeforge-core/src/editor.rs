//! Editing session: surface, history and tool state behind one owner.
//!
//! Every public mutation goes through the surface and then drains its
//! event queue into the history, so the log sees exactly the changes a
//! user made and never the ones a replay made.

use crate::config::AppConfig;
use crate::history::{HistoryConfig, HistoryError, HistoryManager, Snapshot};
use crate::shapes::{
    Arrow, Image, InvalidImage, Rectangle, SerializableColor, Shape, ShapeId, Text,
};
use crate::surface::{Surface, SurfaceDocument};
use crate::tools::ToolState;
use kurbo::{Affine, Point, Vec2};
use thiserror::Error;

/// Where new captions land.
pub const TEXT_ORIGIN: Point = Point::new(100.0, 100.0);
/// Where new rectangles land.
pub const RECTANGLE_ORIGIN: Point = Point::new(150.0, 150.0);
pub const RECTANGLE_SIZE: (f64, f64) = (150.0, 100.0);
/// New arrows span this segment.
pub const ARROW_SPAN: (Point, Point) = (Point::new(150.0, 150.0), Point::new(250.0, 150.0));
/// Where stickers land.
pub const STICKER_ORIGIN: Point = Point::new(100.0, 100.0);
/// Stickers are inserted at this fraction of their pixel size.
pub const STICKER_SCALE: f64 = 0.3;

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Please upload an image file")]
    InvalidImage(#[from] InvalidImage),
    #[error("Cannot delete background image")]
    ProtectedBackground,
    #[error("Nothing selected")]
    NoSelection,
    #[error("No object with id {0}")]
    NotFound(ShapeId),
    #[error("Object {0} is not text")]
    NotText(ShapeId),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing feedback for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// One editing session.
#[derive(Debug)]
pub struct Editor {
    surface: Surface,
    history: HistoryManager,
    tools: ToolState,
    notices: Vec<Notice>,
}

impl Editor {
    pub fn new(config: &AppConfig) -> EditorResult<Self> {
        let surface = Surface::new(
            config.canvas.width,
            config.canvas.height,
            config.canvas.background(),
        );
        Self::with_surface(surface, config.history)
    }

    /// Start a session on an existing surface; its current state becomes
    /// the first history entry.
    pub fn with_surface(mut surface: Surface, history: HistoryConfig) -> EditorResult<Self> {
        surface.take_events();
        let history = HistoryManager::from_surface(&surface, history)?;
        Ok(Self {
            surface,
            history,
            tools: ToolState::default(),
            notices: Vec::new(),
        })
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn background(&self) -> Option<ShapeId> {
        self.history.background()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drain feedback produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => log::debug!("{}", notice.message),
            NoticeLevel::Error => log::warn!("{}", notice.message),
        }
        self.notices.push(notice);
    }

    fn fail<T>(&mut self, error: EditorError) -> EditorResult<T> {
        self.notify(Notice::error(error.to_string()));
        Err(error)
    }

    fn commit(&mut self) -> EditorResult<bool> {
        Ok(self.history.observe(&mut self.surface)?)
    }

    /// Run an arbitrary surface mutation and record it as one history step,
    /// however many objects it touches. Returns whether anything was recorded.
    pub fn apply(&mut self, f: impl FnOnce(&mut Surface)) -> EditorResult<bool> {
        f(&mut self.surface);
        self.commit()
    }

    /// Replace everything with a new base image, fitted and centered.
    ///
    /// The history restarts from the loaded state and the image becomes the
    /// protected background.
    pub fn load_base_image(&mut self, bytes: &[u8]) -> EditorResult<ShapeId> {
        let mut image = match Image::from_bytes(Point::ZERO, bytes) {
            Ok(image) => image,
            Err(e) => return self.fail(e.into()),
        };
        image.fit_and_center(self.surface.width(), self.surface.height());

        self.surface.clear();
        let id = self.surface.add(Shape::Image(image));
        self.surface.take_events();

        self.history.reset_with(Snapshot::capture(&self.surface)?);
        self.history.adopt_background(id);
        log::info!("Loaded base image {}", id);
        self.notify(Notice::success("Image uploaded successfully!"));
        Ok(id)
    }

    fn insert(&mut self, shape: Shape, message: &str) -> EditorResult<ShapeId> {
        let kind = shape.kind();
        let id = self.surface.add(shape);
        log::info!("Added {} {}", kind.name(), id);
        self.surface.select(id);
        self.commit()?;
        self.notify(Notice::success(message));
        Ok(id)
    }

    pub fn add_text(&mut self) -> EditorResult<ShapeId> {
        let text = self.tools.new_text(TEXT_ORIGIN, Text::PLACEHOLDER);
        self.insert(
            Shape::Text(text),
            "Text added! Drag to reposition, double-click to edit",
        )
    }

    pub fn add_rectangle(&mut self) -> EditorResult<ShapeId> {
        let (width, height) = RECTANGLE_SIZE;
        let rect = Rectangle::new(RECTANGLE_ORIGIN, width, height)
            .with_style(self.tools.rectangle_style());
        self.insert(
            Shape::Rectangle(rect),
            "Rectangle added! Drag corners to resize",
        )
    }

    pub fn add_arrow(&mut self) -> EditorResult<ShapeId> {
        let (start, end) = ARROW_SPAN;
        let arrow = Arrow::new(start, end).with_style(self.tools.arrow_style());
        self.insert(Shape::Arrow(arrow), "Arrow added! Drag to move and resize")
    }

    /// Insert a secondary image at 30% of its pixel size.
    pub fn add_sticker(&mut self, bytes: &[u8]) -> EditorResult<ShapeId> {
        let image = match Image::from_bytes(STICKER_ORIGIN, bytes) {
            Ok(image) => image.with_scale(STICKER_SCALE),
            Err(e) => return self.fail(e.into()),
        };
        self.insert(
            Shape::Image(image),
            "Image added! Drag to move, corners to resize",
        )
    }

    pub fn select(&mut self, id: ShapeId) -> EditorResult<()> {
        if self.surface.select(id) {
            Ok(())
        } else {
            Err(EditorError::NotFound(id))
        }
    }

    /// Select the topmost object under a point.
    pub fn select_at(&mut self, point: Point) -> Option<ShapeId> {
        let hit = self.surface.shape_at_point(point, 4.0)?;
        self.surface.select(hit);
        Some(hit)
    }

    pub fn clear_selection(&mut self) {
        self.surface.clear_selection();
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.surface.selected()
    }

    /// Delete the selected object. The background image is refused.
    pub fn delete_selected(&mut self) -> EditorResult<ShapeId> {
        let Some(id) = self.surface.selected() else {
            return Err(EditorError::NoSelection);
        };
        if self.history.is_background(id) {
            return self.fail(EditorError::ProtectedBackground);
        }
        self.surface.remove(id);
        self.commit()?;
        self.notify(Notice::success("Object deleted"));
        Ok(id)
    }

    /// Drag the selected object.
    pub fn move_selected(&mut self, delta: Vec2) -> EditorResult<()> {
        let id = self.surface.selected().ok_or(EditorError::NoSelection)?;
        self.surface
            .modify(id, |shape| shape.transform(Affine::translate(delta)));
        self.commit()?;
        Ok(())
    }

    /// Replace the content of a text object.
    pub fn set_text(&mut self, id: ShapeId, content: &str) -> EditorResult<()> {
        match self.surface.get(id) {
            None => return Err(EditorError::NotFound(id)),
            Some(shape) if shape.as_text().is_none() => return Err(EditorError::NotText(id)),
            Some(_) => {}
        }
        self.surface.modify(id, |shape| {
            if let Some(text) = shape.as_text_mut() {
                text.set_content(content.to_string());
            }
        });
        self.commit()?;
        Ok(())
    }

    pub fn set_fill_color(&mut self, color: SerializableColor) -> EditorResult<()> {
        self.tools.set_fill_color(color);
        self.restyle_selected_text()
    }

    pub fn set_font_size(&mut self, size: f64) -> EditorResult<f64> {
        let size = self.tools.set_font_size(size);
        self.restyle_selected_text()?;
        Ok(size)
    }

    /// Affects objects created afterwards only.
    pub fn set_outline_color(&mut self, color: SerializableColor) {
        self.tools.set_outline_color(color);
    }

    /// Affects objects created afterwards only.
    pub fn set_outline_width(&mut self, width: f64) -> f64 {
        self.tools.set_outline_width(width)
    }

    fn restyle_selected_text(&mut self) -> EditorResult<()> {
        let Some(id) = self.surface.selected() else {
            return Ok(());
        };
        if self.surface.get(id).and_then(Shape::as_text).is_none() {
            return Ok(());
        }
        let tools = &self.tools;
        self.surface.modify(id, |shape| {
            tools.restyle_text(shape);
        });
        self.commit()?;
        Ok(())
    }

    /// Step back one history entry. `Ok(false)` when already at the start.
    pub fn undo(&mut self) -> EditorResult<bool> {
        match self.history.undo(&mut self.surface) {
            Ok(Some(_)) => {
                self.notify(Notice::success("Undo applied"));
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Step forward one history entry. `Ok(false)` when already at the end.
    pub fn redo(&mut self) -> EditorResult<bool> {
        match self.history.redo(&mut self.surface) {
            Ok(Some(_)) => {
                self.notify(Notice::success("Redo applied"));
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => self.fail(e.into()),
        }
    }

    /// Change the canvas size, refitting the background image. Not recorded.
    pub fn resize_canvas(&mut self, width: f64, height: f64) {
        self.surface.set_dimensions(width, height);
        if let Some(id) = self.history.background() {
            self.surface.update_silently(id, |shape| {
                if let Some(image) = shape.as_image_mut() {
                    image.fit_and_center(width, height);
                }
            });
        }
    }

    /// Drop the selection highlight and hand out the document to render.
    pub fn prepare_export(&mut self) -> SurfaceDocument {
        self.surface.clear_selection();
        self.surface.request_render();
        self.surface.document().clone()
    }

    /// Serialized current state.
    pub fn snapshot(&self) -> EditorResult<Snapshot> {
        Ok(Snapshot::capture(&self.surface)?)
    }

    /// Ids of all objects in z-order.
    pub fn object_ids(&self) -> Vec<ShapeId> {
        self.surface.objects().iter().map(|s| s.id()).collect()
    }
}
