use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Extension of `file_name` without the leading dot, or `""` when there is none.
pub fn file_extension(file_name: &str) -> &str {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
}

/// Seconds since the Unix epoch. Only used to keep generated file names apart.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Keeps ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
/// Field names come from the client and end up in file names on disk.
pub fn sanitize_name_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("image/")
}
