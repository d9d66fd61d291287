//! MemeForge Render Library
//!
//! Turns a surface document into pixels. The software rasterizer covers
//! images, fills, strokes and captions on the CPU, with cosmic-text doing
//! glyph shaping against the system fonts.

mod encode;
mod rasterizer;
mod software;
mod text;

pub use encode::encode_png;
pub use rasterizer::{RasterError, RasterResult, Rasterizer, MAX_DIMENSION};
pub use software::SoftwareRasterizer;
