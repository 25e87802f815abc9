//! Video metadata models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an uploaded source video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Video processing status.
///
/// Statuses progress forward only. Any non-terminal status may fall to
/// `Failed`, and `Failed -> Processing` is the explicit retry edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Upload intent recorded, bytes may not exist yet
    #[default]
    Pending,
    /// Source located and downloaded, probing
    Processing,
    /// Transcription, shot and silence detection in flight
    Transcribing,
    /// Generative model is selecting clips
    Selecting,
    /// Selected clips are being cut and published
    Cutting,
    /// All clips published
    Completed,
    /// Processing failed
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Processing => "processing",
            VideoStatus::Transcribing => "transcribing",
            VideoStatus::Selecting => "selecting",
            VideoStatus::Cutting => "cutting",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(VideoStatus::Pending),
            "processing" => Some(VideoStatus::Processing),
            "transcribing" => Some(VideoStatus::Transcribing),
            "selecting" => Some(VideoStatus::Selecting),
            "cutting" => Some(VideoStatus::Cutting),
            "completed" => Some(VideoStatus::Completed),
            "failed" => Some(VideoStatus::Failed),
            _ => None,
        }
    }

    /// Position along the forward path. `Failed` sits outside it.
    fn stage_index(&self) -> Option<u8> {
        match self {
            VideoStatus::Pending => Some(0),
            VideoStatus::Processing => Some(1),
            VideoStatus::Transcribing => Some(2),
            VideoStatus::Selecting => Some(3),
            VideoStatus::Cutting => Some(4),
            VideoStatus::Completed => Some(5),
            VideoStatus::Failed => None,
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        match (self, next) {
            (VideoStatus::Completed, _) => false,
            (VideoStatus::Failed, VideoStatus::Processing) => true,
            (VideoStatus::Failed, _) => false,
            (_, VideoStatus::Failed) => true,
            (current, next) => match (current.stage_index(), next.stage_index()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }

    /// True for statuses a job may start from.
    pub fn is_startable(&self) -> bool {
        matches!(self, VideoStatus::Pending | VideoStatus::Failed)
    }

    /// True while a job is (or was, before a crash) working on the video.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            VideoStatus::Processing
                | VideoStatus::Transcribing
                | VideoStatus::Selecting
                | VideoStatus::Cutting
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uploaded source asset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    /// Unique video ID
    pub id: VideoId,

    /// Owning project
    pub project_id: String,

    /// Filename as uploaded by the creator
    pub original_filename: String,

    /// Storage path assigned at upload-intent time (may have drifted since)
    pub upload_path: String,

    /// Processing status
    #[serde(default)]
    pub status: VideoStatus,

    /// Duration in seconds, set exactly once by the prober
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Full transcript text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Shot-change timestamps in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_timestamps: Option<Vec<f64>>,

    /// Free-form creator guidance passed to the clip selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_guidance: Option<serde_json::Value>,

    /// Error message for failed videos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a pending video record at upload-intent time.
    pub fn pending(
        project_id: impl Into<String>,
        original_filename: impl Into<String>,
        upload_path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: VideoId::new(),
            project_id: project_id.into(),
            original_filename: original_filename.into(),
            upload_path: upload_path.into(),
            status: VideoStatus::Pending,
            duration_seconds: None,
            transcript: None,
            shot_timestamps: None,
            edit_guidance: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(VideoStatus::Pending.can_transition_to(VideoStatus::Processing));
        assert!(VideoStatus::Processing.can_transition_to(VideoStatus::Transcribing));
        assert!(VideoStatus::Selecting.can_transition_to(VideoStatus::Cutting));
        assert!(VideoStatus::Cutting.can_transition_to(VideoStatus::Completed));
    }

    #[test]
    fn test_no_regression_except_failed() {
        assert!(!VideoStatus::Cutting.can_transition_to(VideoStatus::Processing));
        assert!(!VideoStatus::Selecting.can_transition_to(VideoStatus::Selecting));
        assert!(VideoStatus::Cutting.can_transition_to(VideoStatus::Failed));
        assert!(VideoStatus::Pending.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_failed_only_restarts_processing() {
        assert!(VideoStatus::Failed.can_transition_to(VideoStatus::Processing));
        assert!(!VideoStatus::Failed.can_transition_to(VideoStatus::Completed));
        assert!(!VideoStatus::Failed.can_transition_to(VideoStatus::Failed));
    }

    #[test]
    fn test_completed_is_final() {
        assert!(!VideoStatus::Completed.can_transition_to(VideoStatus::Failed));
        assert!(!VideoStatus::Completed.can_transition_to(VideoStatus::Processing));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            VideoStatus::Pending,
            VideoStatus::Processing,
            VideoStatus::Transcribing,
            VideoStatus::Selecting,
            VideoStatus::Cutting,
            VideoStatus::Completed,
            VideoStatus::Failed,
        ] {
            assert_eq!(VideoStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(VideoStatus::parse("bogus"), None);
    }
}
