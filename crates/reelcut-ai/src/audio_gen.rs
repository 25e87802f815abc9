//! Generative audio client for sound effects and music beds.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use reelcut_models::SoundKind;

use crate::error::{AiError, AiResult};
use crate::retry::with_retry;

const SERVICE: &str = "audio_gen";

#[derive(Debug, Clone)]
pub struct AudioGenConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl AudioGenConfig {
    pub fn from_env() -> AiResult<Self> {
        let api_key = std::env::var("AUDIO_GEN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::config_error("AUDIO_GEN_API_KEY not set"))?;

        Ok(Self {
            api_key,
            base_url: std::env::var("AUDIO_GEN_BASE_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
            timeout: Duration::from_secs(180),
            max_retries: 1,
        })
    }
}

/// Text-to-audio generation. Returns MP3 bytes.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    /// `duration` is clamped into the bounds of `kind` before the request.
    async fn generate(&self, prompt: &str, kind: SoundKind, duration: f64) -> AiResult<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct SoundEffectRequest<'a> {
    text: &'a str,
    duration_seconds: f64,
}

#[derive(Debug, Serialize)]
struct MusicRequest<'a> {
    prompt: &'a str,
    music_length_ms: u64,
}

pub struct AudioGenClient {
    http: Client,
    config: AudioGenConfig,
}

impl AudioGenClient {
    pub fn new(config: AudioGenConfig) -> AiResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(AudioGenConfig::from_env()?)
    }

    fn request(&self, prompt: &str, kind: SoundKind, duration: f64) -> reqwest::RequestBuilder {
        let base = self.config.base_url.trim_end_matches('/');
        let builder = match kind {
            SoundKind::Effect => self
                .http
                .post(format!("{}/v1/sound-generation", base))
                .json(&SoundEffectRequest {
                    text: prompt,
                    duration_seconds: duration,
                }),
            SoundKind::Music => self.http.post(format!("{}/v1/music", base)).json(&MusicRequest {
                prompt,
                music_length_ms: (duration * 1000.0).round() as u64,
            }),
        };
        builder
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
    }
}

#[async_trait]
impl AudioGenerator for AudioGenClient {
    async fn generate(&self, prompt: &str, kind: SoundKind, duration: f64) -> AiResult<Vec<u8>> {
        let duration = kind.clamp_duration(duration);

        let bytes = with_retry(SERVICE, self.config.max_retries, || async {
            let response = self.request(prompt, kind, duration).send().await?;
            if !response.status().is_success() {
                return Err(AiError::from_response(SERVICE, response).await);
            }
            Ok::<Vec<u8>, AiError>(response.bytes().await?.to_vec())
        })
        .await?;

        if bytes.is_empty() {
            return Err(AiError::invalid_response(SERVICE, "empty audio body"));
        }
        info!(kind = kind.as_str(), duration, bytes = bytes.len(), "Generated audio");
        Ok(bytes)
    }
}
