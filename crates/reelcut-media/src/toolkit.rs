//! The media operations the worker needs, behind one injectable trait.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use reelcut_models::{EncodingConfig, SilenceInterval};

use crate::error::MediaResult;
use crate::mix::{SoundLayer, SoundMixer};
use crate::probe::{probe_media, MediaInfo};
use crate::silence::{detect_silence, SilenceConfig};

#[async_trait]
pub trait MediaToolkit: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;

    async fn detect_silence(&self, path: &Path, duration: Option<f64>) -> MediaResult<Vec<SilenceInterval>>;

    async fn extract_audio(&self, input: &Path, output: &Path) -> MediaResult<()>;

    async fn cut_clip(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()>;

    async fn mix(&self, video_url: &str, layers: &[SoundLayer], output: &Path) -> MediaResult<()>;
}

/// ffmpeg/ffprobe-backed toolkit.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    silence: SilenceConfig,
    encoding: EncodingConfig,
    mixer: SoundMixer,
}

impl FfmpegToolkit {
    pub fn new(
        silence: SilenceConfig,
        encoding: EncodingConfig,
        client: reqwest::Client,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            silence,
            encoding,
            mixer: SoundMixer::new(client, scratch_root),
        }
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }

    async fn detect_silence(&self, path: &Path, duration: Option<f64>) -> MediaResult<Vec<SilenceInterval>> {
        detect_silence(path, &self.silence, duration).await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> MediaResult<()> {
        crate::audio::extract_audio(input, output).await
    }

    async fn cut_clip(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()> {
        crate::clip::cut_clip(input, output, start, duration, &self.encoding).await
    }

    async fn mix(&self, video_url: &str, layers: &[SoundLayer], output: &Path) -> MediaResult<()> {
        self.mixer.mix(video_url, layers, output).await
    }
}
