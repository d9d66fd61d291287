//! Caption rasterization: cosmic-text shapes and rasterizes the glyphs into a
//! coverage mask, which is then painted as an outline and a fill.

use crate::software::blend;
use cosmic_text::{
    Attrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight, Wrap,
};
use image::{GrayImage, RgbaImage};
use memeforge_core::shapes::{FontWeight, SerializableColor, ShapeTrait, Text};
use std::sync::{Mutex, PoisonError};

/// Line height as a multiple of the font size, same as caption bounds.
const LINE_HEIGHT: f32 = 1.2;

/// Owns the font database. Fonts are loaded on first use.
#[derive(Debug, Default)]
pub(crate) struct TextPainter {
    fonts: Mutex<Option<FontSystem>>,
}

impl TextPainter {
    pub(crate) fn with_font_system(font_system: FontSystem) -> Self {
        Self {
            fonts: Mutex::new(Some(font_system)),
        }
    }

    pub(crate) fn draw(&self, canvas: &mut RgbaImage, text: &Text, scale: f64) {
        if text.content().trim().is_empty() {
            return;
        }
        let mut fonts = self.fonts.lock().unwrap_or_else(PoisonError::into_inner);
        let font_system = fonts.get_or_insert_with(|| {
            let font_system = FontSystem::new();
            log::debug!("Loaded {} font faces", font_system.db().len());
            font_system
        });

        let Some(family) = resolve_family(font_system, &text.font_family) else {
            log::warn!("No fonts installed, skipping text {:?}", text.content());
            return;
        };
        let mask = coverage_mask(font_system, text, &family, scale, canvas.dimensions());
        drop(fonts);

        let style = text.style();
        let outline = style.stroke_with_opacity();
        let radius = style.stroke_width * scale / 2.0;
        if radius > 0.0 && outline.a > 0 {
            paint_outline(canvas, &mask, outline, radius);
        }
        if let Some(fill) = style.fill_with_opacity() {
            paint_fill(canvas, &mask, fill);
        }
    }
}

/// First installed family from a CSS family list. Generic names go through
/// the database's generic mapping; with no match the first installed face is
/// used. `None` only when no fonts are installed at all.
fn resolve_family(font_system: &FontSystem, css: &str) -> Option<String> {
    let db = font_system.db();
    let installed = |name: &str| {
        db.faces()
            .flat_map(|face| face.families.iter())
            .find(|(family, _)| family.eq_ignore_ascii_case(name))
            .map(|(family, _)| family.clone())
    };

    css.split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
        .find_map(|name| match generic_family(name) {
            Some(generic) => installed(db.family_name(&generic)),
            None => installed(name),
        })
        .or_else(|| {
            db.faces()
                .find_map(|face| face.families.first())
                .map(|(family, _)| family.clone())
        })
}

fn generic_family(name: &str) -> Option<Family<'static>> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Some(Family::Serif),
        "sans-serif" => Some(Family::SansSerif),
        "monospace" => Some(Family::Monospace),
        "cursive" => Some(Family::Cursive),
        "fantasy" => Some(Family::Fantasy),
        _ => None,
    }
}

/// Glyph coverage in canvas pixels plus the touched area.
struct Mask {
    coverage: GrayImage,
    /// `(x0, y0, x1, y1)`, exclusive on the far edges.
    bounds: Option<(u32, u32, u32, u32)>,
}

impl Mask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            coverage: GrayImage::new(width, height),
            bounds: None,
        }
    }

    fn cover(&mut self, x: i32, y: i32, alpha: u8) {
        if alpha == 0 || x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        if x >= self.coverage.width() || y >= self.coverage.height() {
            return;
        }
        let pixel = self.coverage.get_pixel_mut(x, y);
        pixel[0] = pixel[0].max(alpha);
        self.bounds = Some(match self.bounds {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }

    /// Coverage in `0.0..=1.0`; zero outside the canvas.
    fn at(&self, x: i64, y: i64) -> f64 {
        if x < 0 || y < 0 || x >= self.coverage.width() as i64 || y >= self.coverage.height() as i64
        {
            return 0.0;
        }
        self.coverage.get_pixel(x as u32, y as u32)[0] as f64 / 255.0
    }
}

fn coverage_mask(
    font_system: &mut FontSystem,
    text: &Text,
    family: &str,
    scale: f64,
    (width, height): (u32, u32),
) -> Mask {
    let font_size = (text.font_size * scale) as f32;
    let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT);
    let weight = match text.font_weight {
        FontWeight::Regular => Weight::NORMAL,
        FontWeight::Bold => Weight::BOLD,
    };
    let attrs = Attrs::new().family(Family::Name(family)).weight(weight);

    let mut buffer = Buffer::new(font_system, metrics);
    let mut buffer = buffer.borrow_with(font_system);
    buffer.set_wrap(Wrap::None);
    buffer.set_size(width as f32, height as f32);
    buffer.set_text(text.content(), attrs, Shaping::Advanced);

    let origin_x = (text.position.x * scale).round() as i32;
    let origin_y = (text.position.y * scale).round() as i32;
    let mut mask = Mask::new(width, height);
    let mut cache = SwashCache::new();
    buffer.draw(&mut cache, Color::rgb(0xff, 0xff, 0xff), |x, y, w, h, color| {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                mask.cover(origin_x + x + dx, origin_y + y + dy, color.a());
            }
        }
    });
    mask
}

/// Pixel area of the mask grown by `pad`, clipped to the canvas.
fn padded_bounds(mask: &Mask, pad: u32) -> Option<(u32, u32, u32, u32)> {
    let (x0, y0, x1, y1) = mask.bounds?;
    Some((
        x0.saturating_sub(pad),
        y0.saturating_sub(pad),
        (x1 + pad).min(mask.coverage.width()),
        (y1 + pad).min(mask.coverage.height()),
    ))
}

/// Dilate the glyph coverage by `radius` and paint it underneath the fill.
fn paint_outline(canvas: &mut RgbaImage, mask: &Mask, color: SerializableColor, radius: f64) {
    let reach = radius.ceil() as i64 + 1;
    let kernel: Vec<(i64, i64, f64)> = (-reach..=reach)
        .flat_map(|dy| (-reach..=reach).map(move |dx| (dx, dy)))
        .filter_map(|(dx, dy)| {
            // one pixel of linear falloff at the edge
            let falloff = (radius + 0.5 - ((dx * dx + dy * dy) as f64).sqrt()).clamp(0.0, 1.0);
            (falloff > 0.0).then_some((dx, dy, falloff))
        })
        .collect();

    let Some((x0, y0, x1, y1)) = padded_bounds(mask, reach as u32) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = kernel
                .iter()
                .map(|(dx, dy, falloff)| mask.at(x as i64 + dx, y as i64 + dy) * falloff)
                .fold(0.0, f64::max);
            if coverage > 0.0 {
                blend(canvas.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}

fn paint_fill(canvas: &mut RgbaImage, mask: &Mask, color: SerializableColor) {
    let Some((x0, y0, x1, y1)) = mask.bounds else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            let coverage = mask.at(x as i64, y as i64);
            if coverage > 0.0 {
                blend(canvas.get_pixel_mut(x, y), color, coverage);
            }
        }
    }
}
