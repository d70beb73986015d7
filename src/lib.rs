pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod monitoring;
pub mod processing;
pub mod server;
pub mod storage;
pub mod upload;
pub mod utils;

pub use app::{AppState, InitError, Uploadforge};
pub use config::{Config, RawUploadOptions, ResizeRatio, UploadOptions};
pub use error::{OptionsError, TransformError, UploadError};
pub use upload::{DerivativeRecord, IncomingFilePart, Uploader};
