//! Sound effect and background music models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Unique identifier for a sound effect item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SfxId(pub String);

impl SfxId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SfxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SfxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SfxId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of generated audio. Each kind has its own generator duration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SoundKind {
    /// Short one-shot effect
    Effect,
    /// Longer music bed
    Music,
}

impl SoundKind {
    /// Shortest duration the generator accepts, in seconds.
    pub fn min_duration(&self) -> f64 {
        match self {
            SoundKind::Effect => 0.5,
            SoundKind::Music => 10.0,
        }
    }

    /// Longest duration the generator accepts, in seconds.
    pub fn max_duration(&self) -> f64 {
        match self {
            SoundKind::Effect => 22.0,
            SoundKind::Music => 300.0,
        }
    }

    /// Clamp a requested duration into the generator bounds.
    pub fn clamp_duration(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return self.min_duration();
        }
        seconds.clamp(self.min_duration(), self.max_duration())
    }

    pub fn accepts_duration(&self, seconds: f64) -> bool {
        seconds >= self.min_duration() && seconds <= self.max_duration()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundKind::Effect => "effect",
            SoundKind::Music => "music",
        }
    }
}

/// One timestamped sound effect attached to a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct SfxItem {
    pub id: SfxId,

    /// Offset into the clip in seconds
    #[validate(range(min = 0.0))]
    pub timestamp: f64,

    /// Short label shown in the editor
    #[validate(length(min = 1, max = 80))]
    pub label: String,

    /// Prompt sent to the audio generator
    #[validate(length(min = 1, max = 500))]
    pub prompt: String,

    /// Public URL of the generated audio
    pub audio_url: String,

    /// Generated audio duration in seconds
    pub duration: f64,

    /// Per-item gain (0.0-1.0), defaults to 1.0 when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub volume: Option<f64>,
}

impl SfxItem {
    pub fn effective_volume(&self) -> f64 {
        self.volume.unwrap_or(1.0)
    }

    /// Check the item against the clip it is attached to.
    pub fn fits_clip(&self, clip_duration: f64) -> bool {
        self.timestamp >= 0.0
            && self.timestamp < clip_duration
            && SoundKind::Effect.accepts_duration(self.duration)
    }
}

/// Background music bed mixed under a whole clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct BackgroundMusic {
    #[validate(length(min = 1, max = 500))]
    pub prompt: String,
    pub audio_url: String,
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub volume: Option<f64>,
}

impl BackgroundMusic {
    pub fn effective_volume(&self) -> f64 {
        self.volume.unwrap_or(1.0)
    }
}
