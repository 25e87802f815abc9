//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration: {0}")]
    ConfigError(String),

    /// No candidate location held the object
    #[error("No such object: {0}")]
    NotFound(String),

    #[error("Upload of {0}")]
    UploadFailed(String),

    #[error("Download of {0}")]
    DownloadFailed(String),

    #[error("Delete of {0}")]
    DeleteFailed(String),

    #[error("Listing {0}")]
    ListFailed(String),

    #[error("Local file: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 request failed: {0}")]
    Sdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
