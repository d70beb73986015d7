//! Upload orchestration: multipart decoding, per-file dispatch and record collection.

use crate::config::UploadOptions;
use crate::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_TRANSFER_ENCODING};
use crate::error::UploadError;
use crate::filter::ExtensionFilter;
use crate::monitoring;
use crate::processing::apply_operation;
use crate::processing::planner::{passthrough_file_name, plan_derivatives, DerivativePlan, Operation};
use crate::storage::{DerivativeSink, LocalStorage};
use crate::utils::{is_image_mime, unix_timestamp};
use axum::extract::Multipart;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// One file part as produced by the multipart decoder. Read-only input.
#[derive(Debug, Clone)]
pub struct IncomingFilePart {
    pub field_name: String,
    pub original_name: String,
    pub encoding: String,
    pub mime_type: String,
    pub raw_bytes: Bytes,
}

/// Metadata for one produced file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivativeRecord {
    pub field_name: String,
    pub original_name: String,
    pub encoding: String,
    pub mime_type: String,
    pub file_name: String,
    pub destination_path: PathBuf,
}

impl DerivativeRecord {
    fn new(part: &IncomingFilePart, file_name: String, destination_path: PathBuf) -> Self {
        Self {
            field_name: part.field_name.clone(),
            original_name: part.original_name.clone(),
            encoding: part.encoding.clone(),
            mime_type: part.mime_type.clone(),
            file_name,
            destination_path,
        }
    }
}

/// Turns multipart requests into derivatives on disk.
///
/// Holds no per-request state, so one instance (or its clones) can serve any
/// number of concurrent requests. The semaphore bounds CPU-bound transforms
/// across all of them.
#[derive(Clone)]
pub struct Uploader {
    options: Arc<UploadOptions>,
    filter: Arc<ExtensionFilter>,
    sink: Arc<dyn DerivativeSink>,
    semaphore: Arc<Semaphore>,
}

impl Uploader {
    pub fn new(options: UploadOptions, semaphore: Arc<Semaphore>) -> Self {
        Self::with_sink(options, semaphore, Arc::new(LocalStorage))
    }

    pub fn with_sink(options: UploadOptions, semaphore: Arc<Semaphore>, sink: Arc<dyn DerivativeSink>) -> Self {
        let filter = Arc::new(ExtensionFilter::new(options.allow_extension()));
        Self {
            options: Arc::new(options),
            filter,
            sink,
            semaphore,
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Decodes the request and processes every file part in order.
    ///
    /// Any failure rejects the whole request. Files already written by earlier
    /// parts are left in place.
    pub async fn upload_files(&self, multipart: Multipart) -> Result<Vec<DerivativeRecord>, UploadError> {
        let result = match self.decode_parts(multipart).await {
            Ok(parts) => self.process_parts(parts).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(records) => {
                monitoring::increment_uploads("success");
                info!("Upload completed derivatives={}", records.len());
            }
            Err(err) => {
                monitoring::increment_uploads("error");
                error!("Upload failed: {}", err);
            }
        }
        result
    }

    /// Reads every file part of the body into memory.
    ///
    /// Each part passes the extension filter before its bytes are read; the
    /// first rejected part aborts decoding. Fields without a file name (plain
    /// form values, or file inputs left empty) are skipped.
    pub async fn decode_parts(&self, mut multipart: Multipart) -> Result<Vec<IncomingFilePart>, UploadError> {
        let mut parts = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let original_name = field.file_name().filter(|name| !name.is_empty()).map(str::to_string);
            let Some(original_name) = original_name else {
                debug!("Skipping non-file field {:?}", field.name());
                continue;
            };
            let field_name = field.name().unwrap_or_default().to_string();
            let mime_type = field.content_type().unwrap_or(DEFAULT_CONTENT_TYPE).to_string();
            let encoding = field
                .headers()
                .get("content-transfer-encoding")
                .and_then(|value| value.to_str().ok())
                .unwrap_or(DEFAULT_TRANSFER_ENCODING)
                .to_string();

            self.check_allowed(&original_name, &mime_type)?;

            let raw_bytes = field.bytes().await?;
            debug!(
                "Decoded part field={} name={} mime={} bytes={}",
                field_name,
                original_name,
                mime_type,
                raw_bytes.len()
            );
            parts.push(IncomingFilePart {
                field_name,
                original_name,
                encoding,
                mime_type,
                raw_bytes,
            });
        }

        Ok(parts)
    }

    /// Processes already-decoded parts, in order.
    ///
    /// Every part is checked against the allow-list before anything is written,
    /// so a rejected part leaves no output behind. File names are unique within
    /// the call: a name already issued (same field within the same second, or a
    /// repeated resize ratio) gets a `_{n}` suffix before its extension.
    pub async fn process_parts(&self, parts: Vec<IncomingFilePart>) -> Result<Vec<DerivativeRecord>, UploadError> {
        for part in &parts {
            self.check_allowed(&part.original_name, &part.mime_type)?;
        }

        let mut records = Vec::new();
        let mut issued = IssuedNames::default();
        for part in &parts {
            let timestamp = unix_timestamp();
            if is_image_mime(&part.mime_type) {
                monitoring::increment_uploaded_files("image");
                records.extend(self.process_image(part, timestamp, &mut issued).await?);
            } else {
                monitoring::increment_uploaded_files("other");
                records.push(self.process_other(part, timestamp, &mut issued).await?);
            }
        }
        Ok(records)
    }

    async fn process_image(
        &self,
        part: &IncomingFilePart,
        timestamp: u64,
        issued: &mut IssuedNames,
    ) -> Result<Vec<DerivativeRecord>, UploadError> {
        let plans = plan_derivatives(&part.field_name, &self.options, timestamp);
        debug!("Planned {} derivative(s) for {}", plans.len(), part.original_name);

        let mut records = Vec::with_capacity(plans.len());
        for mut plan in plans {
            let file_name = issued.claim(plan.file_name);
            plan.destination_path = self.options.destination_dir().join(&file_name);
            plan.file_name = file_name;
            let output = self.render(part, &plan).await?;
            self.sink.write(&plan.destination_path, &output).await?;
            monitoring::increment_derivatives_written(plan.operation.as_str());
            info!(
                "Derivative written field={} operation={} path={} bytes={}",
                part.field_name,
                plan.operation.as_str(),
                plan.destination_path.display(),
                output.len()
            );
            records.push(DerivativeRecord::new(part, plan.file_name, plan.destination_path));
        }
        Ok(records)
    }

    async fn render(&self, part: &IncomingFilePart, plan: &DerivativePlan) -> Result<Vec<u8>, UploadError> {
        if plan.operation == Operation::Passthrough {
            return Ok(part.raw_bytes.to_vec());
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| UploadError::Internal("Semaphore closed".to_string()))?;

        let bytes = part.raw_bytes.clone();
        let operation = plan.operation;
        let quality = self.options.image_quality();
        tokio::task::spawn_blocking(move || apply_operation(&bytes, operation, quality))
            .await
            .map_err(|e| UploadError::Internal(format!("Transform task failed: {}", e)))?
            .map_err(|e| e.into_upload_error(&part.original_name))
    }

    async fn process_other(
        &self,
        part: &IncomingFilePart,
        timestamp: u64,
        issued: &mut IssuedNames,
    ) -> Result<DerivativeRecord, UploadError> {
        let file_name = issued.claim(passthrough_file_name(&part.field_name, &part.original_name, timestamp));
        let destination_path = self.options.destination_dir().join(&file_name);
        let record = DerivativeRecord::new(part, file_name, destination_path);
        self.sink.forward(&record, &part.raw_bytes).await?;
        debug!("Forwarded non-image part field={} name={}", part.field_name, record.file_name);
        Ok(record)
    }

    fn check_allowed(&self, original_name: &str, mime_type: &str) -> Result<(), UploadError> {
        if self.filter.accepts(original_name, mime_type) {
            Ok(())
        } else {
            warn!("Rejected file type name={} mime={}", original_name, mime_type);
            Err(UploadError::InvalidFileType {
                original_name: original_name.to_string(),
                mime_type: mime_type.to_string(),
            })
        }
    }
}

/// File names handed out during one `process_parts` call.
#[derive(Debug, Default)]
struct IssuedNames(HashSet<String>);

impl IssuedNames {
    /// Returns `file_name` if unused, else the first free `{stem}_{n}.{ext}`.
    fn claim(&mut self, file_name: String) -> String {
        if self.0.insert(file_name.clone()) {
            return file_name;
        }

        let (stem, extension) = match file_name.rsplit_once('.') {
            Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
            None => (file_name.clone(), String::new()),
        };
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}{}", stem, n, extension);
            if self.0.insert(candidate.clone()) {
                debug!("Renamed colliding file name {} to {}", file_name, candidate);
                return candidate;
            }
            n += 1;
        }
    }
}
