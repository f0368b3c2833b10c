//! # Output Module
//!
//! Writes rendered images to disk:
//! - PNG: 8-bit, channels clamped to [0, 1] and quantized directly. Pixels
//!   leave the renderer already display-ready, so no gamma curve is applied.
//! - EXR: 32-bit float RGB, written as-is.
//!
//! The format is picked from the file extension.

use std::path::Path;

use exr::prelude::*;
use image::{ImageBuffer, Rgb};
use log::info;

use crate::error::{Error, Result};
use crate::renderer::Image;

/// Save `image` to `output_path`, choosing PNG or EXR from the extension.
pub fn save_image(image: &Image, output_path: &str) -> Result<()> {
    let extension = Path::new(output_path)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => save_image_as_png(image, output_path),
        "exr" => save_image_as_exr(image, output_path),
        _ => Err(Error::UnsupportedOutput(output_path.to_string())),
    }
}

/// Quantize a [0, 1] channel to 8 bits with rounding.
fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Save an f32 RGB image as an 8-bit PNG.
pub fn save_image_as_png(image: &Image, output_path: &str) -> Result<()> {
    let (width, height) = image.dimensions();
    let u8_image: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        Rgb([to_u8(pixel[0]), to_u8(pixel[1]), to_u8(pixel[2])])
    });

    u8_image.save(output_path)?;
    info!("Image saved as {}", output_path);
    Ok(())
}

/// Save an f32 RGB image as EXR with full float precision.
pub fn save_image_as_exr(image: &Image, output_path: &str) -> Result<()> {
    let (width, height) = image.dimensions();

    write_rgb_file(output_path, width as usize, height as usize, |x, y| {
        let pixel = image.get_pixel(x as u32, y as u32);
        (pixel[0], pixel[1], pixel[2])
    })?;

    info!("HDR image saved as EXR: {}", output_path);
    Ok(())
}
