//! Job payloads accepted by the one-shot worker.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::{ClipId, SfxId, VideoId};

/// Unique identifier for a job run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run the full ingest pipeline for one uploaded video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ProcessVideoJob {
    #[serde(default)]
    pub job_id: JobId,

    pub video_id: VideoId,

    #[validate(length(min = 1))]
    pub project_id: String,

    /// Original script the video was shot from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_text: Option<String>,

    /// Generate sound effects for each published clip
    #[serde(default)]
    pub auto_sfx: bool,
}

impl ProcessVideoJob {
    pub fn new(video_id: VideoId, project_id: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            video_id,
            project_id: project_id.into(),
            script_text: None,
            auto_sfx: false,
        }
    }
}

/// Replace a completed video's clip set using reviewer feedback.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ReanalyzeJob {
    #[serde(default)]
    pub job_id: JobId,

    pub video_id: VideoId,

    #[validate(length(min = 1, max = 4000))]
    pub feedback: String,
}

/// One sound operation on a single clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SoundAction {
    /// Let the model propose moments and generate an effect for each
    GenerateSfx {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<u32>,
    },
    AddSfx {
        prompt: String,
        label: String,
        timestamp: f64,
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
    },
    /// Prompt change regenerates the audio, timestamp change only re-mixes
    UpdateSfx {
        sfx_id: SfxId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
    },
    DeleteSfx {
        sfx_id: SfxId,
    },
    SetMusic {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        volume: Option<f64>,
    },
    ClearMusic,
    Remix,
}

impl SoundAction {
    pub fn name(&self) -> &'static str {
        match self {
            SoundAction::GenerateSfx { .. } => "generate_sfx",
            SoundAction::AddSfx { .. } => "add_sfx",
            SoundAction::UpdateSfx { .. } => "update_sfx",
            SoundAction::DeleteSfx { .. } => "delete_sfx",
            SoundAction::SetMusic { .. } => "set_music",
            SoundAction::ClearMusic => "clear_music",
            SoundAction::Remix => "remix",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SoundJob {
    #[serde(default)]
    pub job_id: JobId,

    pub clip_id: ClipId,

    #[serde(flatten)]
    pub action: SoundAction,
}
