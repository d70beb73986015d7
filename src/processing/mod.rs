pub mod planner;
pub mod save;
pub mod transform;

use crate::error::TransformError;
use crate::monitoring;
use crate::processing::planner::Operation;
use std::time::Instant;
use tracing::debug;

/// Produces the bytes of one derivative.
///
/// Every branch except [`Operation::Passthrough`] decodes the upload and
/// re-encodes it as JPEG, whatever the input format was. Passthrough returns
/// the original bytes unchanged.
///
/// This is CPU-bound and blocking; async callers should run it on a blocking
/// thread.
pub fn apply_operation(image_bytes: &[u8], operation: Operation, quality: u8) -> Result<Vec<u8>, TransformError> {
    let start = Instant::now();
    debug!("Applying {} to {} bytes", operation.as_str(), image_bytes.len());

    let output = match operation {
        Operation::CompressAndResize(ratio) => {
            transform::compress_and_resize(image_bytes, ratio.width, ratio.height, quality)?
        }
        Operation::Resize(ratio) => transform::resize(image_bytes, ratio.width, ratio.height)?,
        Operation::Compress => transform::compress(image_bytes, quality)?,
        Operation::Passthrough => image_bytes.to_vec(),
    };

    let duration = start.elapsed().as_secs_f64();
    monitoring::observe_image_transform_duration(operation.as_str(), duration);
    debug!("{} produced {} bytes in {:.3}s", operation.as_str(), output.len(), duration);

    Ok(output)
}
