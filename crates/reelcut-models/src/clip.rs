//! Clip models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::sound::{BackgroundMusic, SfxId, SfxItem};
use crate::VideoId;

/// Unique identifier for a clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
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

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClipId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpanError {
    #[error("clip start {start:.3}s must be before end {end:.3}s")]
    Inverted { start: f64, end: f64 },

    #[error("clip boundaries must be finite and non-negative")]
    OutOfRange,
}

/// Start/end of a clip in source-video seconds.
///
/// The duration is derived from the boundaries and never stored
/// independently; it is only emitted on serialization for readers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpan {
    start: f64,
    end: f64,
}

impl ClipSpan {
    pub fn new(start: f64, end: f64) -> Result<Self, SpanError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(SpanError::OutOfRange);
        }
        if start >= end {
            return Err(SpanError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Duration rounded to millisecond precision.
    pub fn duration(&self) -> f64 {
        ((self.end - self.start) * 1000.0).round() / 1000.0
    }

    /// True when the two spans share any interior time.
    pub fn overlaps(&self, other: &ClipSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Serialize, Deserialize)]
struct SpanRecord {
    start_time: f64,
    end_time: f64,
    #[serde(default, skip_deserializing)]
    duration: f64,
}

impl Serialize for ClipSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SpanRecord {
            start_time: self.start,
            end_time: self.end,
            duration: self.duration(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ClipSpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = SpanRecord::deserialize(deserializer)?;
        ClipSpan::new(record.start_time, record.end_time).map_err(serde::de::Error::custom)
    }
}

/// One selected and cut segment of a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,

    pub video_id: VideoId,

    /// Object path in the processed bucket, set once cut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,

    /// Public URL of the cut clip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    #[serde(flatten)]
    pub span: ClipSpan,

    /// Suggested posting order, 1 = post first
    pub strategic_rank: u32,

    /// Model-assigned viral potential, advisory only
    pub hook_score: f64,

    pub rationale: String,

    pub title: String,

    pub hook: String,

    /// Reviewer decision: `None` until decided
    #[serde(default)]
    pub approved: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sfx: Vec<SfxItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed_video_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<BackgroundMusic>,

    pub created_at: DateTime<Utc>,
}

impl Clip {
    pub fn start_time(&self) -> f64 {
        self.span.start()
    }

    pub fn end_time(&self) -> f64 {
        self.span.end()
    }

    pub fn duration(&self) -> f64 {
        self.span.duration()
    }

    pub fn find_sfx(&self, id: &SfxId) -> Option<&SfxItem> {
        self.sfx.iter().find(|item| &item.id == id)
    }

    /// True when the clip carries anything the sound mixer has to lay down.
    pub fn has_sound_layers(&self) -> bool {
        !self.sfx.is_empty() || self.background_music.is_some()
    }
}

/// Sound-related fields of a clip, written by the sound mixer independently
/// of all other clip fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipSoundUpdate {
    pub sfx: Vec<SfxItem>,
    pub mixed_video_url: Option<String>,
    pub background_music: Option<BackgroundMusic>,
}

impl ClipSoundUpdate {
    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            sfx: clip.sfx.clone(),
            mixed_video_url: clip.mixed_video_url.clone(),
            background_music: clip.background_music.clone(),
        }
    }
}
