//! Whisper-compatible transcription client.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use reelcut_models::{Transcript, Word};

use crate::error::{AiError, AiResult};
use crate::retry::{record_call, with_retry};

const SERVICE: &str = "transcription";

#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl TranscriptionConfig {
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("TRANSCRIPTION_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::config_error("TRANSCRIPTION_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("TRANSCRIPTION_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: std::env::var("TRANSCRIPTION_MODEL").unwrap_or_else(|_| "whisper-1".to_string()),
            timeout: Duration::from_secs(600),
            max_retries: 2,
        })
    }
}

/// Speech-to-text over an extracted audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Word-level, time-aligned transcript.
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcript>;

    /// Plain transcript text only.
    async fn transcribe_text(&self, audio: &Path) -> AiResult<String> {
        Ok(self.transcribe(audio).await?.text)
    }
}

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WireWord>,
}

#[derive(Debug, Deserialize)]
struct WireWord {
    word: String,
    start: f64,
    end: f64,
}

impl From<VerboseTranscription> for Transcript {
    fn from(wire: VerboseTranscription) -> Self {
        let words = wire
            .words
            .into_iter()
            .filter(|w| w.start.is_finite() && w.end.is_finite() && !w.word.trim().is_empty())
            .map(|w| Word::new(w.word, w.start, w.end.max(w.start)))
            .collect();
        Transcript {
            text: wire.text.trim().to_string(),
            words,
        }
    }
}

pub struct WhisperClient {
    http: Client,
    config: TranscriptionConfig,
}

impl WhisperClient {
    pub fn new(config: TranscriptionConfig) -> AiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(TranscriptionConfig::from_env()?)
    }

    async fn form(&self, audio: &Path, response_format: &str, word_timestamps: bool) -> AiResult<Form> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.ogg".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(audio))?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", response_format.to_string());
        if word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }
        Ok(form)
    }

    async fn post(&self, audio: &Path, response_format: &str, word_timestamps: bool) -> AiResult<reqwest::Response> {
        let url = format!("{}/audio/transcriptions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(self.form(audio, response_format, word_timestamps).await?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(AiError::from_response(SERVICE, response).await);
        }
        Ok(response)
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcript> {
        debug!(audio = %audio.display(), "Requesting word-level transcript");
        let transcript: Transcript = with_retry(SERVICE, self.config.max_retries, || async {
            let wire: VerboseTranscription = self.post(audio, "verbose_json", true).await?.json().await?;
            Ok::<Transcript, AiError>(wire.into())
        })
        .await?;

        info!(words = transcript.word_count(), "Transcription complete");
        Ok(transcript)
    }

    async fn transcribe_text(&self, audio: &Path) -> AiResult<String> {
        let started = Instant::now();
        let result: AiResult<String> = async {
            let text = self.post(audio, "text", false).await?.text().await?;
            Ok(text.trim().to_string())
        }
        .await;
        record_call(SERVICE, result.is_ok(), started);
        result
    }
}
