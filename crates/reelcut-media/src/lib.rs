//! FFmpeg CLI wrapper for the clipping pipeline.
//!
//! This crate provides:
//! - A single external-tool runner with stderr capture and metrics
//! - Duration and stream probing
//! - Silence detection, audio extraction and frame-accurate cutting
//! - The multi-input sound-mix filter graph
//! - Scratch directories that clean up on every exit path

pub mod audio;
pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod mix;
pub mod probe;
pub mod scratch;
pub mod silence;
pub mod toolkit;

pub use audio::extract_audio;
pub use clip::cut_clip;
pub use command::{check_ffmpeg, check_ffprobe, run_tool, FfmpegCommand, ToolOutput};
pub use download::download_to_file;
pub use error::{MediaError, MediaResult};
pub use mix::{MixGraph, SoundLayer, SoundMixer};
pub use probe::{get_duration, has_audio_stream, probe_media, MediaInfo};
pub use scratch::ScratchDir;
pub use silence::{detect_silence, parse_silencedetect, SilenceConfig};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
