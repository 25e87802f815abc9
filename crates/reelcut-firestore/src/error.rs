//! Firestore error types.

use thiserror::Error;

use reelcut_models::VideoStatus;

pub type FirestoreResult<T> = Result<T, FirestoreError>;

#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Firestore auth: {0}")]
    AuthError(String),

    #[error("No such document: {0}")]
    NotFound(String),

    #[error("Document exists: {0}")]
    AlreadyExists(String),

    #[error("Firestore denied access: {0}")]
    PermissionDenied(String),

    #[error("Firestore rejected request: {0}")]
    RequestFailed(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Unexpected Firestore response: {0}")]
    InvalidResponse(String),

    #[error("Document encoding: {0}")]
    SerializationError(String),

    #[error("Firestore throttled the request (retry in {0}ms)")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document changed concurrently: {0}")]
    PreconditionFailed(String),

    #[error("Transaction aborted: {0}")]
    TransactionFailed(String),

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: VideoStatus, to: VideoStatus },
}

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn transaction_failed(msg: impl Into<String>) -> Self {
        Self::TransactionFailed(msg.into())
    }

    /// Map an HTTP status and body onto an error variant.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => Self::AuthError(body),
            403 => Self::PermissionDenied(body),
            404 => Self::NotFound(body),
            409 if body.contains("ABORTED") => Self::TransactionFailed(body),
            409 => Self::AlreadyExists(body),
            412 => Self::PreconditionFailed(body),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, body),
            _ => Self::RequestFailed(body),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AuthError(_) => Some(401),
            Self::PermissionDenied(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::AlreadyExists(_) | Self::TransactionFailed(_) => Some(409),
            Self::PreconditionFailed(_) => Some(412),
            Self::RateLimited(_) => Some(429),
            Self::ServerError(code, _) => Some(*code),
            Self::RequestFailed(_) => Some(400),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Suggested wait before retrying, when the server gave one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Transport faults, throttling and 5xx.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FirestoreError::Network(_) | FirestoreError::RateLimited(_) | FirestoreError::ServerError(..)
        )
    }

    /// The write lost an `updateTime` race.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, FirestoreError::PreconditionFailed(_))
            || matches!(
                self,
                FirestoreError::RequestFailed(msg)
                if msg.contains("FAILED_PRECONDITION") || msg.contains("Precondition")
            )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FirestoreError::NotFound(_))
    }
}
