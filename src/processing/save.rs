use crate::error::TransformError;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

/// Encodes an image as baseline JPEG at `quality` (1-100).
///
/// JPEG carries no alpha, so the image is flattened to RGB8 first.
pub fn save_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let rgb = img.to_rgb8();
    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| TransformError::Encode(format!("Error encoding JPEG: {}", e)))?;
    Ok(output)
}
