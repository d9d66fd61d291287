//! Tool state: the style applied to newly inserted objects.

use crate::shapes::{FontWeight, SerializableColor, Shape, ShapeStyle, Text};
use serde::{Deserialize, Serialize};

/// Current styling for new objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolState {
    pub fill_color: SerializableColor,
    pub outline_color: SerializableColor,
    pub outline_width: f64,
    pub font_size: f64,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            fill_color: SerializableColor::white(),
            outline_color: SerializableColor::black(),
            outline_width: 2.0,
            font_size: Text::DEFAULT_FONT_SIZE,
        }
    }
}

impl ToolState {
    pub const MIN_OUTLINE_WIDTH: f64 = 0.0;
    pub const MAX_OUTLINE_WIDTH: f64 = 10.0;
    pub const MIN_FONT_SIZE: f64 = 12.0;
    pub const MAX_FONT_SIZE: f64 = 120.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fill_color(&mut self, color: SerializableColor) {
        self.fill_color = color;
    }

    pub fn set_outline_color(&mut self, color: SerializableColor) {
        self.outline_color = color;
    }

    /// Set the outline width, clamped to 0..=10. Returns the stored value.
    pub fn set_outline_width(&mut self, width: f64) -> f64 {
        self.outline_width = clamp_finite(
            width,
            Self::MIN_OUTLINE_WIDTH,
            Self::MAX_OUTLINE_WIDTH,
            self.outline_width,
        );
        self.outline_width
    }

    /// Set the font size, clamped to 12..=120. Returns the stored value.
    pub fn set_font_size(&mut self, size: f64) -> f64 {
        self.font_size = clamp_finite(
            size,
            Self::MIN_FONT_SIZE,
            Self::MAX_FONT_SIZE,
            self.font_size,
        );
        self.font_size
    }

    /// Style for new text: tool fill and outline.
    pub fn text_style(&self) -> ShapeStyle {
        ShapeStyle::filled(self.fill_color, self.outline_color, self.outline_width)
    }

    /// Style for new rectangles: tool fill, tool outline color, fixed width.
    pub fn rectangle_style(&self) -> ShapeStyle {
        ShapeStyle::filled(self.fill_color, self.outline_color, 2.0)
    }

    /// Style for new arrows: stroked with the fill color.
    pub fn arrow_style(&self) -> ShapeStyle {
        ShapeStyle::stroked(self.fill_color, 3.0)
    }

    /// Copy the fill color and font size onto an existing text shape.
    /// Returns false for shapes that don't take text styling.
    pub fn restyle_text(&self, shape: &mut Shape) -> bool {
        let Some(text) = shape.as_text_mut() else {
            return false;
        };
        text.style.fill_color = Some(self.fill_color);
        text.font_size = self.font_size;
        true
    }

    /// A new caption in the current style.
    pub fn new_text(&self, position: kurbo::Point, content: &str) -> Text {
        Text::new(position, content.to_string())
            .with_font_size(self.font_size)
            .with_font_weight(FontWeight::Bold)
            .with_style(self.text_style())
    }
}

fn clamp_finite(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}
