use crate::constants::DEFAULT_IMAGE_QUALITY;
use crate::error::TransformError;
use crate::processing::save::save_jpeg;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// Decodes any raster format the codec recognizes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, TransformError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| TransformError::Decode(format!("Error loading image from memory: {}", e)))?;
    debug!("Loaded image: {}x{}", img.width(), img.height());
    Ok(img)
}

/// Re-encodes the image as JPEG at `quality` without changing its size.
pub fn compress(bytes: &[u8], quality: u8) -> Result<Vec<u8>, TransformError> {
    let img = decode(bytes)?;
    save_jpeg(&img, quality)
}

/// Stretches the image to exactly `width` x `height`, ignoring aspect ratio.
/// The result is JPEG at the codec's default quality.
pub fn resize(bytes: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TransformError> {
    let img = decode(bytes)?;
    save_jpeg(&stretch(&img, width, height), DEFAULT_IMAGE_QUALITY)
}

/// Resize then re-encode at `quality`, in one decode/encode pass.
pub fn compress_and_resize(bytes: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, TransformError> {
    let img = decode(bytes)?;
    save_jpeg(&stretch(&img, width, height), quality)
}

fn stretch(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    debug!(
        "Resizing {}x{} to {}x{}",
        img.width(),
        img.height(),
        width,
        height
    );
    img.resize_exact(width, height, FilterType::Lanczos3)
}
