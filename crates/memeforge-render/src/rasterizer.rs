//! Rasterizer trait abstraction.

use image::RgbaImage;
use memeforge_core::surface::SurfaceDocument;
use thiserror::Error;

/// Largest output edge in pixels.
pub const MAX_DIMENSION: u32 = 8192;

/// Rasterization errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid output size {width}x{height} (multiplier {multiplier})")]
    InvalidSize {
        width: f64,
        height: f64,
        multiplier: f64,
    },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Result type for rasterizer operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Trait for rasterizing backends.
///
/// Implementations can draw on the CPU or read back from a GPU renderer.
pub trait Rasterizer: Send + Sync {
    /// Draw the document at `multiplier` times its CSS size.
    fn rasterize(&self, document: &SurfaceDocument, multiplier: f64) -> RasterResult<RgbaImage>;
}

/// Pixel size of the output, validated.
pub(crate) fn output_size(document: &SurfaceDocument, multiplier: f64) -> RasterResult<(u32, u32)> {
    let invalid = || RasterError::InvalidSize {
        width: document.width,
        height: document.height,
        multiplier,
    };
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return Err(invalid());
    }
    let width = (document.width * multiplier).round();
    let height = (document.height * multiplier).round();
    if !(1.0..=MAX_DIMENSION as f64).contains(&width) || !(1.0..=MAX_DIMENSION as f64).contains(&height) {
        return Err(invalid());
    }
    Ok((width as u32, height as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size() {
        let document = SurfaceDocument::default();
        assert_eq!(output_size(&document, 1.0).unwrap(), (800, 450));
        assert_eq!(output_size(&document, 2.0).unwrap(), (1600, 900));
        assert!(output_size(&document, 0.0).is_err());
        assert!(output_size(&document, f64::NAN).is_err());
        assert!(output_size(&document, 100.0).is_err());
    }
}
