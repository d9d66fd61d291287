//! PNG encoding.

use crate::rasterizer::{RasterError, RasterResult};
use image::RgbaImage;

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(pixels: &RgbaImage) -> RasterResult<Vec<u8>> {
    let (width, height) = pixels.dimensions();
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RasterError::Encode(e.to_string()))?;
        writer
            .write_image_data(pixels.as_raw())
            .map_err(|e| RasterError::Encode(e.to_string()))?;
    }
    log::debug!("Encoded {}x{} PNG: {} bytes", width, height, png_data.len());
    Ok(png_data)
}
