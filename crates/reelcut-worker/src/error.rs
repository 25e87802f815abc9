//! Worker error types.

use thiserror::Error;

use reelcut_ai::AiError;
use reelcut_firestore::FirestoreError;
use reelcut_media::MediaError;
use reelcut_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Failure classes reported on a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ValidationFailure,
    Timeout,
    SubprocessFailure,
    TransactionFailure,
    ConfigurationFailure,
    External,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::ValidationFailure => "validation_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::SubprocessFailure => "subprocess_failure",
            ErrorKind::TransactionFailure => "transaction_failure",
            ErrorKind::ConfigurationFailure => "configuration_failure",
            ErrorKind::External => "external",
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid model output: {0}")]
    Validation(String),

    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    #[error("Clip cutting failed for {failed} of {total} clips: {details}")]
    CutsFailed {
        failed: usize,
        total: usize,
        details: String,
    },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("AI service error: {0}")]
    Ai(#[from] AiError),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::NotFound(_) => ErrorKind::NotFound,
            WorkerError::Validation(_) | WorkerError::InvalidJob(_) => ErrorKind::ValidationFailure,
            WorkerError::Timeout { .. } => ErrorKind::Timeout,
            WorkerError::CutsFailed { .. } => ErrorKind::SubprocessFailure,
            WorkerError::ConfigError(_) => ErrorKind::ConfigurationFailure,
            WorkerError::Storage(e) if e.is_not_found() => ErrorKind::NotFound,
            WorkerError::Storage(StorageError::ConfigError(_)) => ErrorKind::ConfigurationFailure,
            WorkerError::Firestore(e) if e.is_not_found() => ErrorKind::NotFound,
            WorkerError::Firestore(FirestoreError::TransactionFailed(_)) => ErrorKind::TransactionFailure,
            WorkerError::Firestore(FirestoreError::AuthError(_)) => ErrorKind::ConfigurationFailure,
            WorkerError::Media(MediaError::Timeout(_)) => ErrorKind::Timeout,
            WorkerError::Media(e) if e.is_subprocess_failure() => ErrorKind::SubprocessFailure,
            WorkerError::Media(MediaError::FileNotFound(_)) => ErrorKind::NotFound,
            WorkerError::Ai(AiError::ConfigError(_)) => ErrorKind::ConfigurationFailure,
            WorkerError::Ai(AiError::Timeout { .. }) => ErrorKind::Timeout,
            WorkerError::Ai(AiError::InvalidResponse { .. }) => ErrorKind::ValidationFailure,
            _ => ErrorKind::External,
        }
    }

    /// Whether another selection attempt may produce a different outcome.
    pub fn is_selection_retryable(&self) -> bool {
        match self {
            WorkerError::Validation(_) | WorkerError::Timeout { .. } => true,
            WorkerError::Ai(e) => {
                matches!(e, AiError::InvalidResponse { .. } | AiError::Json(_)) || e.is_retryable()
            }
            _ => false,
        }
    }

    /// Message stored on a failed video.
    pub fn status_message(&self) -> String {
        format!("[{}] {}", self.kind().as_str(), self)
    }
}
