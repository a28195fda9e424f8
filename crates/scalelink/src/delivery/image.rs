//! Product image thumbnails for scale terminals

use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

use scalelink_common::{Result, ScaleError};

/// Edge of the square thumbnail expected by the terminals
pub const DEFAULT_IMAGE_SIZE: u32 = 120;

/// Fit `data` inside a `size`x`size` square, centered on a transparent
/// background, and encode it in the format named by `suffix`.
pub fn resize_for_scale(data: &[u8], suffix: &str, size: u32) -> Result<Vec<u8>> {
    let source = image::load_from_memory(data)
        .map_err(|e| ScaleError::Image(format!("cannot decode product image: {}", e)))?;

    let thumbnail = source.resize(size, size, FilterType::Lanczos3).to_rgba8();
    let mut canvas = RgbaImage::new(size, size);
    let x = i64::from((size - thumbnail.width()) / 2);
    let y = i64::from((size - thumbnail.height()) / 2);
    imageops::overlay(&mut canvas, &thumbnail, x, y);

    let format = output_format(suffix)?;
    let output = match format {
        // JPEG has no alpha channel
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        _ => DynamicImage::ImageRgba8(canvas),
    };

    let mut buffer = Cursor::new(Vec::new());
    output
        .write_to(&mut buffer, format)
        .map_err(|e| ScaleError::Image(format!("cannot encode {} thumbnail: {}", suffix, e)))?;
    Ok(buffer.into_inner())
}

fn output_format(suffix: &str) -> Result<ImageFormat> {
    let extension = suffix.trim_start_matches('.');
    ImageFormat::from_extension(extension)
        .ok_or_else(|| ScaleError::Image(format!("unsupported image suffix '{}'", suffix)))
}
