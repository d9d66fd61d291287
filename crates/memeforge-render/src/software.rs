//! CPU rasterizer built on `image` pixel buffers and kurbo geometry.

use crate::rasterizer::{RasterResult, Rasterizer, output_size};
use crate::text::TextPainter;
use cosmic_text::FontSystem;
use image::{Rgba, RgbaImage, imageops};
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape as KurboShape};
use memeforge_core::shapes::{
    Image, SerializableColor, Shape, ShapeStyle, ShapeTrait, point_to_segment_dist,
};
use memeforge_core::surface::SurfaceDocument;

/// Draws images, fills, strokes and captions on the CPU.
///
/// System fonts are loaded the first time a caption is drawn.
#[derive(Debug, Default)]
pub struct SoftwareRasterizer {
    text: TextPainter,
}

impl SoftwareRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a prepared font database instead of the system fonts.
    pub fn with_font_system(font_system: FontSystem) -> Self {
        Self {
            text: TextPainter::with_font_system(font_system),
        }
    }

    fn draw_shape(&self, canvas: &mut RgbaImage, shape: &Shape, transform: Affine, scale: f64) {
        match shape {
            Shape::Image(image) => draw_image(canvas, image, transform),
            Shape::Text(text) => self.text.draw(canvas, text, scale),
            Shape::Rectangle(_) | Shape::Arrow(_) => {
                let path = transform * shape.to_path();
                let style = shape.style();
                if let Some(fill) = style.fill_with_opacity() {
                    fill_path(canvas, &path, fill);
                }
                stroke_path(canvas, &path, style, scale);
            }
        }
    }
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, document: &SurfaceDocument, multiplier: f64) -> RasterResult<RgbaImage> {
        let (width, height) = output_size(document, multiplier)?;
        let bg = document.background_color;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([bg.r, bg.g, bg.b, bg.a]));
        let transform = Affine::scale(multiplier);

        for shape in &document.objects {
            self.draw_shape(&mut canvas, shape, transform, multiplier);
        }
        log::debug!(
            "Rasterized {} objects at {}x{}",
            document.objects.len(),
            width,
            height
        );
        Ok(canvas)
    }
}

/// Source-over blend of `color` at `coverage` into one pixel.
pub(crate) fn blend(pixel: &mut Rgba<u8>, color: SerializableColor, coverage: f64) {
    let src_a = (color.a as f64 / 255.0) * coverage.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = pixel[3] as f64 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    let channel = |src: u8, dst: u8| {
        let value = (src as f64 * src_a + dst as f64 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    *pixel = Rgba([
        channel(color.r, pixel[0]),
        channel(color.g, pixel[1]),
        channel(color.b, pixel[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

/// Pixel index range covered by `rect`, clipped to the canvas.
fn pixel_span(canvas: &RgbaImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.x0.floor().max(0.0);
    let y0 = rect.y0.floor().max(0.0);
    let x1 = rect.x1.ceil().min(canvas.width() as f64);
    let y1 = rect.y1.ceil().min(canvas.height() as f64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_path(canvas: &mut RgbaImage, path: &BezPath, color: SerializableColor) {
    let Some((x0, y0, x1, y1)) = pixel_span(canvas, path.bounding_box()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if path.winding(center) != 0 {
                blend(canvas.get_pixel_mut(x, y), color, 1.0);
            }
        }
    }
}

/// Flatten a path into line segments, closing subpaths where asked.
fn segments(path: &BezPath) -> Vec<(Point, Point)> {
    let mut out = Vec::new();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;
    kurbo::flatten(path.iter(), 0.25, |el| match el {
        PathEl::MoveTo(p) => {
            start = p;
            last = p;
        }
        PathEl::LineTo(p) => {
            out.push((last, p));
            last = p;
        }
        PathEl::ClosePath => {
            if last != start {
                out.push((last, start));
            }
            last = start;
        }
        // flatten only emits the three above
        _ => {}
    });
    out
}

fn stroke_path(canvas: &mut RgbaImage, path: &BezPath, style: &ShapeStyle, scale: f64) {
    let half = style.stroke_width * scale / 2.0;
    let color = style.stroke_with_opacity();
    if half <= 0.0 || color.a == 0 {
        return;
    }
    let segments = segments(path);
    let Some((x0, y0, x1, y1)) = pixel_span(canvas, path.bounding_box().inflate(half + 1.0, half + 1.0))
    else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let distance = segments
                .iter()
                .map(|(a, b)| point_to_segment_dist(center, *a, *b))
                .fold(f64::INFINITY, f64::min);
            // one pixel of linear falloff at the edge
            let coverage = half + 0.5 - distance;
            if coverage > 0.0 {
                blend(canvas.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

fn draw_image(canvas: &mut RgbaImage, image: &Image, transform: Affine) {
    let target = transform.transform_rect_bbox(image.as_rect());
    let (width, height) = (target.width().round(), target.height().round());
    if width < 1.0 || height < 1.0 {
        return;
    }

    let decoded = image
        .data()
        .and_then(|raw| image::load_from_memory(&raw).ok())
        .map(|d| d.to_rgba8());
    let Some(decoded) = decoded else {
        log::warn!("Could not decode image {}, drawing placeholder", image.id());
        draw_placeholder(canvas, target);
        return;
    };

    let scaled = imageops::resize(
        &decoded,
        width as u32,
        height as u32,
        imageops::FilterType::Triangle,
    );
    imageops::overlay(
        canvas,
        &scaled,
        target.x0.round() as i64,
        target.y0.round() as i64,
    );
}

fn draw_placeholder(canvas: &mut RgbaImage, target: Rect) {
    let path = target.to_path(0.1);
    fill_path(canvas, &path, SerializableColor::new(200, 200, 200, 255));
    stroke_path(
        canvas,
        &path,
        &ShapeStyle::stroked(SerializableColor::new(150, 150, 150, 255), 1.0),
        1.0,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use memeforge_core::shapes::{Arrow, FontWeight, ImageFormat, Rectangle, Text};
    use pretty_assertions::{assert_eq, assert_ne};

    fn document(objects: Vec<Shape>) -> SurfaceDocument {
        SurfaceDocument {
            objects,
            width: 40.0,
            height: 20.0,
            ..SurfaceDocument::default()
        }
    }

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        crate::encode_png(&img).unwrap()
    }

    #[test]
    fn test_background_only() {
        let canvas = SoftwareRasterizer::new().rasterize(&document(vec![]), 1.0).unwrap();
        assert_eq!(canvas.dimensions(), (40, 20));
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([0xf5, 0xf5, 0xf5, 255]));
    }

    #[test]
    fn test_multiplier_scales_output() {
        let canvas = SoftwareRasterizer::new().rasterize(&document(vec![]), 2.0).unwrap();
        assert_eq!(canvas.dimensions(), (80, 40));
    }

    #[test]
    fn test_filled_rectangle() {
        let red = SerializableColor::new(255, 0, 0, 255);
        let rect = Rectangle::new(Point::new(10.0, 5.0), 10.0, 10.0)
            .with_style(ShapeStyle::filled(red, SerializableColor::black(), 0.0));
        let canvas = SoftwareRasterizer::new()
            .rasterize(&document(vec![Shape::Rectangle(rect)]), 1.0)
            .unwrap();
        assert_eq!(canvas.get_pixel(15, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([0xf5, 0xf5, 0xf5, 255]));
    }

    #[test]
    fn test_arrow_stroke() {
        let arrow = Arrow::new(Point::new(2.0, 10.0), Point::new(38.0, 10.0));
        let canvas = SoftwareRasterizer::new()
            .rasterize(&document(vec![Shape::Arrow(arrow)]), 1.0)
            .unwrap();
        assert_eq!(canvas.get_pixel(20, 10), &Rgba([0, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(20, 2), &Rgba([0xf5, 0xf5, 0xf5, 255]));
    }

    #[test]
    fn test_image_is_composited() {
        let data = solid_png(4, 4, [0, 0, 255, 255]);
        let image = Image::new(Point::new(20.0, 0.0), &data, 4, 4, ImageFormat::Png)
            .with_size(20.0, 20.0);
        let canvas = SoftwareRasterizer::new()
            .rasterize(&document(vec![Shape::Image(image)]), 1.0)
            .unwrap();
        assert_eq!(canvas.get_pixel(30, 10), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(10, 10), &Rgba([0xf5, 0xf5, 0xf5, 255]));
    }

    #[test]
    fn test_undecodable_image_gets_placeholder() {
        let image = Image::new(Point::ZERO, b"garbage", 4, 4, ImageFormat::Png).with_size(10.0, 10.0);
        let canvas = SoftwareRasterizer::new()
            .rasterize(&document(vec![Shape::Image(image)]), 1.0)
            .unwrap();
        assert_eq!(canvas.get_pixel(5, 5), &Rgba([200, 200, 200, 255]));
    }

    fn caption(content: &str) -> Text {
        Text::new(Point::new(10.0, 10.0), content.to_string())
            .with_font_size(40.0)
            .with_font_weight(FontWeight::Bold)
            .with_style(ShapeStyle::filled(
                SerializableColor::white(),
                SerializableColor::black(),
                4.0,
            ))
    }

    fn wide_document(objects: Vec<Shape>) -> SurfaceDocument {
        SurfaceDocument {
            objects,
            width: 160.0,
            height: 80.0,
            ..SurfaceDocument::default()
        }
    }

    #[test]
    fn test_caption_is_drawn_with_outline() {
        let rasterizer = SoftwareRasterizer::new();
        let blank = rasterizer.rasterize(&wide_document(vec![]), 1.0).unwrap();
        let canvas = rasterizer
            .rasterize(&wide_document(vec![Shape::Text(caption("HELLO"))]), 1.0)
            .unwrap();
        if FontSystem::new().db().len() == 0 {
            assert_eq!(canvas, blank);
            return;
        }

        assert_ne!(canvas, blank);
        assert!(canvas.pixels().any(|p| p == &Rgba([255, 255, 255, 255])));
        assert!(canvas.pixels().any(|p| p[0] < 64 && p[1] < 64 && p[2] < 64));
        // Nothing above the caption's top edge.
        assert_eq!(canvas.get_pixel(80, 2), &Rgba([0xf5, 0xf5, 0xf5, 255]));
    }

    #[test]
    fn test_caption_scales_with_multiplier() {
        let document = wide_document(vec![Shape::Text(caption("HELLO"))]);
        let rasterizer = SoftwareRasterizer::new();
        let inked = |canvas: &RgbaImage| {
            canvas
                .pixels()
                .filter(|p| *p != &Rgba([0xf5, 0xf5, 0xf5, 255]))
                .count()
        };
        let small = inked(&rasterizer.rasterize(&document, 1.0).unwrap());
        let large = inked(&rasterizer.rasterize(&document, 2.0).unwrap());
        assert!(large >= small * 3);
    }

    #[test]
    fn test_caption_without_fonts_is_skipped() {
        let fonts = FontSystem::new_with_locale_and_db(
            "en-US".to_string(),
            cosmic_text::fontdb::Database::new(),
        );
        let rasterizer = SoftwareRasterizer::with_font_system(fonts);
        let blank = rasterizer.rasterize(&document(vec![]), 1.0).unwrap();
        let canvas = rasterizer
            .rasterize(&document(vec![Shape::Text(caption("hi"))]), 1.0)
            .unwrap();
        assert_eq!(canvas, blank);
    }

    #[test]
    fn test_blend_half_transparent() {
        let mut pixel = Rgba([0, 0, 0, 255]);
        blend(&mut pixel, SerializableColor::new(255, 255, 255, 128), 1.0);
        assert!((pixel[0] as i32 - 128).abs() <= 1);
        assert_eq!(pixel[3], 255);
    }
}
