//! Image shape for raster images (base image and stickers).

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;
use uuid::Uuid;

/// Rejection reasons for bytes that are not a usable image.
#[derive(Debug, Error)]
pub enum InvalidImage {
    #[error("Unsupported file type, please use a PNG, JPEG, WebP or GIF image")]
    UnsupportedFormat,
    #[error("Could not read image: {0}")]
    Decode(String),
    #[error("Image has zero width or height")]
    Empty,
}

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }

        // GIF87a / GIF89a
        if data.starts_with(b"GIF8") {
            return Some(ImageFormat::Gif);
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }

        None
    }
}

/// An image shape that displays a raster image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Original image width in pixels.
    pub source_width: u32,
    /// Original image height in pixels.
    pub source_height: u32,
    /// Image format.
    pub format: ImageFormat,
    /// Image data as base64-encoded string, so snapshots stay plain JSON.
    pub data_base64: String,
    /// Style properties (stroke used for optional border).
    pub style: ShapeStyle,
}

impl Image {
    /// Create a new image shape from raw image data with known dimensions.
    pub fn new(
        position: Point,
        data: &[u8],
        source_width: u32,
        source_height: u32,
        format: ImageFormat,
    ) -> Self {
        use base64::{Engine, engine::general_purpose::STANDARD};

        Self {
            id: Uuid::new_v4(),
            position,
            width: source_width as f64,
            height: source_height as f64,
            source_width,
            source_height,
            format,
            data_base64: STANDARD.encode(data),
            style: ShapeStyle::stroked(super::SerializableColor::transparent(), 0.0),
        }
    }

    /// Create an image shape from encoded bytes, sniffing the format and
    /// reading the pixel dimensions from the header.
    pub fn from_bytes(position: Point, data: &[u8]) -> Result<Self, InvalidImage> {
        let format = ImageFormat::from_magic_bytes(data).ok_or(InvalidImage::UnsupportedFormat)?;
        let (width, height) = ::image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| InvalidImage::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| InvalidImage::Decode(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(InvalidImage::Empty);
        }
        Ok(Self::new(position, data, width, height, format))
    }

    /// Create an image shape with specific display dimensions.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Scale the display size uniformly relative to the source size.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.width = self.source_width as f64 * scale;
        self.height = self.source_height as f64 * scale;
        self
    }

    /// Fit into a canvas of the given size and center it.
    pub fn fit_and_center(&mut self, canvas_width: f64, canvas_height: f64) {
        let scale = (canvas_width / self.source_width.max(1) as f64)
            .min(canvas_height / self.source_height.max(1) as f64);
        self.width = self.source_width as f64 * scale;
        self.height = self.source_height as f64 * scale;
        self.position = Point::new(
            (canvas_width - self.width) / 2.0,
            (canvas_height - self.height) / 2.0,
        );
    }

    /// Get the raw image data (decoded from base64).
    pub fn data(&self) -> Option<Vec<u8>> {
        use base64::{Engine, engine::general_purpose::STANDARD};
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Get the bounding rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Image {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let rect = self.as_rect().inflate(tolerance, tolerance);
        rect.contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
        let scale = affine.as_coeffs();
        self.width *= scale[0].abs();
        self.height *= scale[3].abs();
    }
}
