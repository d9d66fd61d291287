//! Scene objects placed on the meme canvas.

mod arrow;
mod image;
mod rectangle;
mod text;

pub use arrow::Arrow;
pub use self::image::{Image, ImageFormat, InvalidImage};
pub use rectangle::Rectangle;
pub use text::{FontWeight, Text};

use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse a CSS hex color (`#rgb`, `#rrggbb`, `#rrggbbaa`).
    /// Returns `None` for anything else.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb` (or `#rrggbbaa` when not fully opaque).
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Style properties for shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Stroke (outline) color.
    pub stroke_color: SerializableColor,
    /// Stroke width. Zero disables the outline.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl ShapeStyle {
    /// Style with a fill and an outline.
    pub fn filled(fill: SerializableColor, stroke: SerializableColor, stroke_width: f64) -> Self {
        Self {
            stroke_color: stroke,
            stroke_width,
            fill_color: Some(fill),
            opacity: 1.0,
        }
    }

    /// Outline-only style.
    pub fn stroked(stroke: SerializableColor, stroke_width: f64) -> Self {
        Self {
            stroke_color: stroke,
            stroke_width,
            fill_color: None,
            opacity: 1.0,
        }
    }

    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> SerializableColor {
        apply_opacity(self.stroke_color, self.opacity)
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<SerializableColor> {
        self.fill_color.map(|c| apply_opacity(c, self.opacity))
    }
}

fn apply_opacity(color: SerializableColor, opacity: f64) -> SerializableColor {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)) as u8;
    SerializableColor::new(color.r, color.g, color.b, alpha)
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self::stroked(SerializableColor::black(), 2.0)
    }
}

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Distance from a point to a line segment (a -> b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Common trait for all shapes.
pub trait ShapeTrait {
    /// Get the unique identifier.
    fn id(&self) -> ShapeId;

    /// Get the bounding box in canvas coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point (in canvas coordinates) hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Get the path representation for rendering.
    fn to_path(&self) -> BezPath;

    /// Get the style.
    fn style(&self) -> &ShapeStyle;

    /// Get mutable style.
    fn style_mut(&mut self) -> &mut ShapeStyle;

    /// Apply a transform to this shape.
    fn transform(&mut self, affine: Affine);
}

/// Discriminant of a [`Shape`], used in logs and notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Image,
    Text,
    Rectangle,
    Arrow,
}

impl ShapeKind {
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Image => "image",
            ShapeKind::Text => "text",
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Arrow => "arrow",
        }
    }
}

/// Enum wrapper for all shape types (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Image(Image),
    Text(Text),
    Rectangle(Rectangle),
    Arrow(Arrow),
}

impl Shape {
    pub fn id(&self) -> ShapeId {
        match self {
            Shape::Image(s) => s.id(),
            Shape::Text(s) => s.id(),
            Shape::Rectangle(s) => s.id(),
            Shape::Arrow(s) => s.id(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Image(_) => ShapeKind::Image,
            Shape::Text(_) => ShapeKind::Text,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
            Shape::Arrow(_) => ShapeKind::Arrow,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Shape::Image(s) => s.bounds(),
            Shape::Text(s) => s.bounds(),
            Shape::Rectangle(s) => s.bounds(),
            Shape::Arrow(s) => s.bounds(),
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match self {
            Shape::Image(s) => s.hit_test(point, tolerance),
            Shape::Text(s) => s.hit_test(point, tolerance),
            Shape::Rectangle(s) => s.hit_test(point, tolerance),
            Shape::Arrow(s) => s.hit_test(point, tolerance),
        }
    }

    pub fn to_path(&self) -> BezPath {
        match self {
            Shape::Image(s) => s.to_path(),
            Shape::Text(s) => s.to_path(),
            Shape::Rectangle(s) => s.to_path(),
            Shape::Arrow(s) => s.to_path(),
        }
    }

    pub fn style(&self) -> &ShapeStyle {
        match self {
            Shape::Image(s) => s.style(),
            Shape::Text(s) => s.style(),
            Shape::Rectangle(s) => s.style(),
            Shape::Arrow(s) => s.style(),
        }
    }

    pub fn style_mut(&mut self) -> &mut ShapeStyle {
        match self {
            Shape::Image(s) => s.style_mut(),
            Shape::Text(s) => s.style_mut(),
            Shape::Rectangle(s) => s.style_mut(),
            Shape::Arrow(s) => s.style_mut(),
        }
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Shape::Image(s) => s.transform(affine),
            Shape::Text(s) => s.transform(affine),
            Shape::Rectangle(s) => s.transform(affine),
            Shape::Arrow(s) => s.transform(affine),
        }
    }

    /// Check if this shape is a raster image.
    pub fn is_image(&self) -> bool {
        matches!(self, Shape::Image(_))
    }

    /// Get the image if this shape is an image.
    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Get the mutable image if this shape is an image.
    pub fn as_image_mut(&mut self) -> Option<&mut Image> {
        match self {
            Shape::Image(img) => Some(img),
            _ => None,
        }
    }

    /// Get the text if this shape is a text.
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Get the mutable text if this shape is a text.
    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Shape::Text(t) => Some(t),
            _ => None,
        }
    }
}
