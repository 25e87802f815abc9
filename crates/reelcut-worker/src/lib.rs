//! One-shot clipping pipeline worker.
//!
//! This crate provides:
//! - The video-to-clips processing job and the feedback re-analysis job
//! - Clip selection with validation and bounded retry
//! - Silence snapping, sequential cutting and clip-set publishing
//! - Sound effect and background music operations on cut clips
//! - Structured job logging

pub mod boundary;
pub mod config;
pub mod context;
pub mod cutter;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod publisher;
pub mod reanalyze;
pub mod retry;
pub mod selector;
pub mod sound;
pub mod source;

pub use config::WorkerConfig;
pub use context::JobContext;
pub use error::{ErrorKind, WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::process_video_job;
pub use reanalyze::reanalyze_job;
pub use sound::apply_sound_action;
