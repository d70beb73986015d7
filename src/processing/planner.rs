use crate::config::{ResizeRatio, UploadOptions};
use crate::constants::OUTPUT_EXTENSION;
use crate::utils::{file_extension, sanitize_name_component};
use std::path::PathBuf;

/// What the transform engine does to produce one derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CompressAndResize(ResizeRatio),
    Resize(ResizeRatio),
    Compress,
    /// Original bytes, untouched.
    Passthrough,
}

impl Operation {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CompressAndResize(_) => "compress_resize",
            Operation::Resize(_) => "resize",
            Operation::Compress => "compress",
            Operation::Passthrough => "passthrough",
        }
    }
}

/// One derivative to produce from an accepted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativePlan {
    pub operation: Operation,
    pub file_name: String,
    pub destination_path: PathBuf,
}

/// Decides the derivatives for one image upload.
///
/// With resize ratios configured there is one derivative per ratio, in the
/// declared order, named `{field}_{width}x{height}_{timestamp}.jpeg`. Otherwise
/// there is exactly one, named `{field}_{timestamp}.jpeg`. The extension is the
/// fixed output format even for the passthrough branch, whose bytes are the
/// original upload.
///
/// Two identical ratios produce the same name here; the uploader suffixes
/// repeats before writing.
pub fn plan_derivatives(field_name: &str, options: &UploadOptions, timestamp: u64) -> Vec<DerivativePlan> {
    let field = sanitize_name_component(field_name);
    let ratios = options.file_resize_ratio();

    if ratios.is_empty() {
        let operation = if options.file_compression() {
            Operation::Compress
        } else {
            Operation::Passthrough
        };
        let file_name = format!("{}_{}.{}", field, timestamp, OUTPUT_EXTENSION);
        return vec![plan(options, operation, file_name)];
    }

    ratios
        .iter()
        .map(|&ratio| {
            let operation = if options.file_compression() {
                Operation::CompressAndResize(ratio)
            } else {
                Operation::Resize(ratio)
            };
            let file_name = format!(
                "{}_{}x{}_{}.{}",
                field, ratio.width, ratio.height, timestamp, OUTPUT_EXTENSION
            );
            plan(options, operation, file_name)
        })
        .collect()
}

/// Name for a non-image upload: `{field}_{timestamp}.{original extension}`.
pub fn passthrough_file_name(field_name: &str, original_name: &str, timestamp: u64) -> String {
    let field = sanitize_name_component(field_name);
    let extension = file_extension(original_name);
    if extension.is_empty() {
        format!("{}_{}", field, timestamp)
    } else {
        format!("{}_{}.{}", field, timestamp, sanitize_name_component(extension))
    }
}

fn plan(options: &UploadOptions, operation: Operation, file_name: String) -> DerivativePlan {
    DerivativePlan {
        operation,
        destination_path: options.destination_dir().join(&file_name),
        file_name,
    }
}
