// Server settings
pub const ENV_WORKERS: &str = "UPLOADFORGE_WORKERS";
pub const ENV_BIND: &str = "UPLOADFORGE_BIND";
pub const ENV_PROMETHEUS_BIND: &str = "UPLOADFORGE_PROMETHEUS_BIND";
pub const ENV_TIMEOUT: &str = "UPLOADFORGE_TIMEOUT";
pub const ENV_MAX_BODY_SIZE: &str = "UPLOADFORGE_MAX_BODY_SIZE";
pub const ENV_LOG_LEVEL: &str = "UPLOADFORGE_LOG_LEVEL";

// Upload options
pub const ENV_FILE_COMPRESSION: &str = "UPLOADFORGE_FILE_COMPRESSION";
pub const ENV_FILE_RESIZE_RATIO: &str = "UPLOADFORGE_FILE_RESIZE_RATIO";
pub const ENV_ALLOW_EXTENSION: &str = "UPLOADFORGE_ALLOW_EXTENSION";
pub const ENV_IMAGE_QUALITY: &str = "UPLOADFORGE_IMAGE_QUALITY";
pub const ENV_BASE_PATH: &str = "UPLOADFORGE_BASE_PATH";
pub const ENV_LOCAL_PATH: &str = "UPLOADFORGE_LOCAL_PATH";

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

pub const DEFAULT_ALLOW_EXTENSION: [&str; 3] = ["jpeg", "jpg", "png"];
pub const DEFAULT_IMAGE_QUALITY: u8 = 80;
pub const DEFAULT_LOCAL_PATH: &str = "../public";

/// Every transform branch re-encodes to this format.
pub const OUTPUT_EXTENSION: &str = "jpeg";

/// Used when a part carries no `Content-Transfer-Encoding` header.
pub const DEFAULT_TRANSFER_ENCODING: &str = "7bit";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
