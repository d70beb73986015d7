use crate::app::AppState;
use crate::error::UploadError;
use crate::upload::DerivativeRecord;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub code: u16,
    pub data: Vec<DerivativeRecord>,
}

/// Handles the /status endpoint, returning a simple JSON status.
pub async fn status_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Handles multipart uploads, returning `{code, data}` with one entry per derivative.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            error!("Upload handler rejected request: {}", rejection.body_text());
            return UploadError::Decoder {
                status: rejection.status(),
                message: rejection.body_text(),
            }
            .into_response();
        }
    };

    match state.uploader.upload_files(multipart).await {
        Ok(records) => {
            let response = UploadResponse {
                code: StatusCode::OK.as_u16(),
                data: records,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("Upload handler error status={} error={}", err.status(), err);
            err.into_response()
        }
    }
}
