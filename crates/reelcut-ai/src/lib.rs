//! Clients for the external AI services used by the pipeline.
//!
//! Each service sits behind a trait so the worker can swap in fakes:
//! - [`GenerativeModel`]: Gemini file upload and JSON-schema structured output
//! - [`Transcriber`]: Whisper-compatible word-level transcription
//! - [`ShotDetector`]: ML shot-boundary service
//! - [`AudioGenerator`]: sound effect and music generation

pub mod audio_gen;
pub mod error;
pub mod gemini;
pub mod retry;
pub mod shots;
pub mod transcription;

pub use audio_gen::{AudioGenClient, AudioGenConfig, AudioGenerator};
pub use error::{AiError, AiResult};
pub use gemini::{response_schema, GeminiClient, GeminiConfig, GenerativeModel, MediaRef, ModelPrompt};
pub use shots::{ShotDetector, ShotServiceClient, ShotServiceConfig};
pub use transcription::{Transcriber, TranscriptionConfig, WhisperClient};
