use crate::error::UploadError;
use crate::upload::DerivativeRecord;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Destination for produced files.
#[async_trait]
pub trait DerivativeSink: Send + Sync {
    /// Persists `bytes` at `path`, creating the parent directory if needed.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), UploadError>;

    /// Hands a non-image upload to remote storage. Nothing is written locally.
    async fn forward(&self, record: &DerivativeRecord, bytes: &[u8]) -> Result<(), UploadError> {
        debug!(
            "Remote storage not configured, skipping {} ({} bytes)",
            record.file_name,
            bytes.len()
        );
        Ok(())
    }
}

/// Writes derivatives to the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

#[async_trait]
impl DerivativeSink for LocalStorage {
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), UploadError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| UploadError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, bytes).await.map_err(|source| UploadError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
