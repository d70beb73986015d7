use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that end an upload request. None of them are retried.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file type not allowed: {original_name} ({mime_type})")]
    InvalidFileType { original_name: String, mime_type: String },

    #[error("failed to decode image {original_name}: {message}")]
    Decode { original_name: String, message: String },

    #[error("failed to encode image {original_name}: {message}")]
    Encode { original_name: String, message: String },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read multipart body: {message}")]
    Decoder { status: StatusCode, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::InvalidFileType { .. } => StatusCode::BAD_REQUEST,
            UploadError::Decoder { status, .. } if status.is_client_error() => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for UploadError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        UploadError::Decoder {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "code": status.as_u16(),
            "data": {},
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Raised by the image codec, before the orchestrator attaches the file name.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

impl TransformError {
    pub(crate) fn into_upload_error(self, original_name: &str) -> UploadError {
        match self {
            TransformError::Decode(message) => UploadError::Decode {
                original_name: original_name.to_string(),
                message,
            },
            TransformError::Encode(message) => UploadError::Encode {
                original_name: original_name.to_string(),
                message,
            },
        }
    }
}

/// Rejected upload options. Raised once, at construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("image quality must be between 1 and 100, got {0}")]
    InvalidQuality(i64),

    #[error("resize ratio {width}x{height} must have positive dimensions")]
    InvalidResizeRatio { width: u32, height: u32 },

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("could not determine the working directory: {0}")]
    BasePath(String),
}
