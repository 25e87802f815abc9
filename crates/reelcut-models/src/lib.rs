//! Shared data models for the Reelcut clipping pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Videos and their processing status state machine
//! - Clips, sound effects and background music
//! - Word-level transcripts, silence intervals and shot boundaries
//! - Job payloads for the one-shot worker
//! - Storage path conventions

pub mod clip;
pub mod encoding;
pub mod job;
pub mod paths;
pub mod segment;
pub mod sound;
pub mod timestamp;
pub mod transcript;
pub mod video;

// Re-export common types
pub use clip::{Clip, ClipId, ClipSoundUpdate, ClipSpan, SpanError};
pub use encoding::EncodingConfig;
pub use job::{JobId, ProcessVideoJob, ReanalyzeJob, SoundAction, SoundJob};
pub use segment::{ShotBoundary, SilenceInterval};
pub use sound::{BackgroundMusic, SfxId, SfxItem, SoundKind};
pub use transcript::{Transcript, Word};
pub use video::{Video, VideoId, VideoStatus};
