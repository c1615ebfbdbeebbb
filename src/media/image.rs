//! Cover and background image processing
//!
//! Downloaded images are decoded, optionally scaled down to a maximum width and
//! re-encoded as baseline JPEG.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// JPEG quality (0-100)
const JPEG_QUALITY: u8 = 90;

/// Decode `data`, shrink it to `max_width` if given and encode as JPEG
pub fn process_image(data: &[u8], max_width: Option<u32>) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess image format")?
        .decode()
        .context("Failed to decode image")?;

    let img = match max_width {
        Some(max_width) => resize_to_width(img, max_width),
        None => img,
    };

    // JPEG has no alpha channel
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
        .encode_image(&img)
        .context("Failed to encode image as JPEG")?;

    debug!(
        "Processed image: {}x{} -> {} bytes",
        img.width(),
        img.height(),
        output.len()
    );
    Ok(output)
}

/// Scale down to `max_width` keeping the aspect ratio
fn resize_to_width(img: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max_width || max_width == 0 {
        return img;
    }

    let new_height = ((height as f64) * (max_width as f64) / (width as f64)).round() as u32;
    debug!(
        "Resizing image: {}x{} -> {}x{}",
        width, height, max_width, new_height
    );
    img.resize_exact(max_width, new_height.max(1), FilterType::Lanczos3)
}
