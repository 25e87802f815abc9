//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg is not on PATH")]
    FfmpegNotFound,

    #[error("ffprobe is not on PATH")]
    FfprobeNotFound,

    #[error("{tool} failed: {message}")]
    ToolFailed {
        tool: String,
        message: String,
        stderr_tail: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Failed to spawn {tool}: {source}")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetching media: {message}")]
    DownloadFailed { message: String },

    #[error("No such media file: {0}")]
    FileNotFound(PathBuf),

    #[error("Media tool killed after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable ffprobe output: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Unusable video: {0}")]
    InvalidVideo(String),

    #[error("Bad media request: {0}")]
    InvalidInput(String),
}

impl MediaError {
    pub fn tool_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        stderr_tail: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
            stderr_tail,
            exit_code,
        }
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// True when an external tool could not run or exited non-zero.
    pub fn is_subprocess_failure(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegNotFound
                | MediaError::FfprobeNotFound
                | MediaError::ToolFailed { .. }
                | MediaError::SpawnFailed { .. }
                | MediaError::Timeout(_)
        )
    }
}
