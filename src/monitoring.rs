use metrics::{describe_counter, describe_histogram, Unit};
use std::sync::Once;

static REGISTER: Once = Once::new();

pub fn register_metrics() {
    REGISTER.call_once(|| {
        describe_histogram!(
            "image_transform_duration_seconds",
            Unit::Seconds,
            "Time spent producing one derivative, in seconds"
        );
        describe_counter!("uploads_total", "Total number of upload requests by outcome");
        describe_counter!("uploaded_files_total", "Total number of accepted file parts by kind");
        describe_counter!("derivatives_written_total", "Total number of derivatives written by operation");
        describe_counter!("status_codes_total", "Total number of response status codes");
    });
}

pub fn observe_image_transform_duration(operation: &str, duration_seconds: f64) {
    let operation_label = operation.to_owned();
    metrics::histogram!("image_transform_duration_seconds", "operation" => operation_label).record(duration_seconds);
}

pub fn increment_uploads(status: &str) {
    let status_label = status.to_owned();
    metrics::counter!("uploads_total", "status" => status_label).increment(1);
}

pub fn increment_uploaded_files(kind: &str) {
    let kind_label = kind.to_owned();
    metrics::counter!("uploaded_files_total", "kind" => kind_label).increment(1);
}

pub fn increment_derivatives_written(operation: &str) {
    let operation_label = operation.to_owned();
    metrics::counter!("derivatives_written_total", "operation" => operation_label).increment(1);
}

pub fn increment_status_code(status: &str) {
    let status_label = status.to_owned();
    metrics::counter!("status_codes_total", "status" => status_label).increment(1);
}
