use crate::config::{Config, UploadOptions};
use crate::error::{OptionsError, UploadError};
use crate::monitoring;
use crate::storage::DerivativeSink;
use crate::upload::{DerivativeRecord, IncomingFilePart, Uploader};
use axum::extract::Multipart;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::info;

/// Bounds concurrent image transforms to the configured worker count.
fn worker_permits(config: &Config) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(config.workers.max(1)))
}

/// Shared application state for uploadforge.
pub struct AppState {
    pub config: Config,
    pub uploader: Uploader,
}

#[derive(Clone)]
pub struct Uploadforge {
    state: Arc<AppState>,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid upload options: {0}")]
    Options(#[from] OptionsError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl Uploadforge {
    /// Create a new instance that writes derivatives to the local filesystem.
    pub fn new(config: Config, options: UploadOptions) -> Self {
        let uploader = Uploader::new(options, worker_permits(&config));
        Self::from_parts(config, uploader)
    }

    /// Create a new instance with a custom destination for derivatives.
    pub fn with_sink(config: Config, options: UploadOptions, sink: Arc<dyn DerivativeSink>) -> Self {
        let uploader = Uploader::with_sink(options, worker_permits(&config), sink);
        Self::from_parts(config, uploader)
    }

    fn from_parts(config: Config, uploader: Uploader) -> Self {
        monitoring::register_metrics();
        info!(
            "Derivatives will be written to {}",
            uploader.options().destination_dir().display()
        );

        let state = Arc::new(AppState { config, uploader });
        Self { state }
    }

    /// Construct uploadforge using environment-derived configuration.
    pub fn from_env() -> Result<Self, InitError> {
        let config = Config::from_env().map_err(InitError::Configuration)?;
        let options = UploadOptions::from_env()?;
        Ok(Self::new(config, options))
    }

    /// Access the shared application state.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Access the effective configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Access the validated upload options.
    pub fn options(&self) -> &UploadOptions {
        self.state.uploader.options()
    }

    /// Decode a multipart request and produce its derivatives.
    pub async fn upload_files(&self, multipart: Multipart) -> Result<Vec<DerivativeRecord>, UploadError> {
        self.state.uploader.upload_files(multipart).await
    }

    /// Produce derivatives for parts decoded elsewhere.
    pub async fn process_parts(&self, parts: Vec<IncomingFilePart>) -> Result<Vec<DerivativeRecord>, UploadError> {
        self.state.uploader.process_parts(parts).await
    }
}
