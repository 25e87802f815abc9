//! Sound mixing onto an already-cut clip.
//!
//! Each sound layer becomes its own ffmpeg input, is gain-adjusted and
//! delayed to its offset, and is summed with the clip's own audio by an
//! unnormalized `amix`. Clips without audio get a short synthesized silent
//! base so the mix always has a first input. The video stream is copied.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::command::FfmpegCommand;
use crate::download::download_to_file;
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;
use crate::scratch::ScratchDir;

/// Length of the synthesized silent base used when a clip has no audio.
pub const SILENT_BASE_SECS: f64 = 0.1;

const SILENT_BASE_SOURCE: &str = "anullsrc=r=44100:cl=stereo";
const MIX_AUDIO_CODEC: &str = "aac";
const MIX_AUDIO_BITRATE: &str = "192k";
const OUTPUT_LABEL: &str = "aout";

/// One audio layer to lay onto the clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundLayer {
    pub audio_url: String,
    /// Offset into the clip in seconds
    pub offset: f64,
    /// Gain, 0.0-1.0
    pub volume: f64,
}

impl SoundLayer {
    pub fn new(audio_url: impl Into<String>, offset: f64, volume: f64) -> Self {
        Self {
            audio_url: audio_url.into(),
            offset,
            volume,
        }
    }
}

/// A built `-filter_complex` graph and the label carrying the mixed audio.
#[derive(Debug, Clone, PartialEq)]
pub struct MixGraph {
    pub filter: String,
    pub output_label: String,
}

impl MixGraph {
    /// Build the graph for input 0 (the clip) plus one input per layer.
    ///
    /// Layer `i` is read from input `i + 1`.
    pub fn build(base_has_audio: bool, layers: &[(f64, f64)]) -> MediaResult<Self> {
        if layers.is_empty() {
            return Err(MediaError::invalid_input("mix needs at least one sound layer"));
        }

        let mut filter = String::new();
        let base = if base_has_audio {
            "[0:a]".to_string()
        } else {
            let _ = write!(
                filter,
                "{},atrim=duration={}[base];",
                SILENT_BASE_SOURCE, SILENT_BASE_SECS
            );
            "[base]".to_string()
        };

        let mut mix_inputs = base;
        for (i, (offset, volume)) in layers.iter().enumerate() {
            if !offset.is_finite() || *offset < 0.0 {
                return Err(MediaError::invalid_input(format!(
                    "sound layer {} has invalid offset {}",
                    i, offset
                )));
            }
            let input = i + 1;
            let delay_ms = (offset * 1000.0).round() as u64;
            let gain = if volume.is_finite() {
                volume.clamp(0.0, 1.0)
            } else {
                1.0
            };
            let _ = write!(
                filter,
                "[{input}:a]volume={gain:.3},adelay={delay_ms}|{delay_ms}[s{input}];"
            );
            let _ = write!(mix_inputs, "[s{input}]");
        }

        let _ = write!(
            filter,
            "{}amix=inputs={}:duration=longest:normalize=0[{}]",
            mix_inputs,
            layers.len() + 1,
            OUTPUT_LABEL
        );

        Ok(Self {
            filter,
            output_label: OUTPUT_LABEL.to_string(),
        })
    }
}

/// Build the ffmpeg command that applies `graph` to the clip and layers.
pub fn mix_command(video: &Path, layer_files: &[PathBuf], graph: &MixGraph, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(video, output);
    for file in layer_files {
        cmd = cmd.input(file);
    }
    cmd.filter_complex(graph.filter.clone())
        .map("0:v")
        .map(format!("[{}]", graph.output_label))
        .video_codec("copy")
        .audio_codec(MIX_AUDIO_CODEC)
        .audio_bitrate(MIX_AUDIO_BITRATE)
        .shortest()
        .output_args(["-movflags", "+faststart"])
}

/// Downloads a clip and its sound layers into scratch space and mixes them.
#[derive(Debug, Clone)]
pub struct SoundMixer {
    client: reqwest::Client,
    scratch_root: PathBuf,
}

impl SoundMixer {
    pub fn new(client: reqwest::Client, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            scratch_root: scratch_root.into(),
        }
    }

    /// Mix `layers` onto the clip at `video_url`, writing the result to `output`.
    ///
    /// Downloads live in a scratch directory that is removed on every exit
    /// path; a partial `output` is removed when mixing fails.
    pub async fn mix(&self, video_url: &str, layers: &[SoundLayer], output: &Path) -> MediaResult<()> {
        if layers.is_empty() {
            return Err(MediaError::invalid_input("mix needs at least one sound layer"));
        }

        let scratch = ScratchDir::new_in(&self.scratch_root, "mix-")?;
        let result = self.mix_in(&scratch, video_url, layers, output).await;

        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(output).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(output = %output.display(), "Failed to remove partial mix output: {}", e);
                }
            }
        }
        if let Err(e) = scratch.close() {
            warn!("Failed to remove mix scratch dir: {}", e);
        }
        result
    }

    async fn mix_in(
        &self,
        scratch: &ScratchDir,
        video_url: &str,
        layers: &[SoundLayer],
        output: &Path,
    ) -> MediaResult<()> {
        let video = scratch.join("clip.mp4");
        download_to_file(&self.client, video_url, &video).await?;

        let mut layer_files = Vec::with_capacity(layers.len());
        for (i, layer) in layers.iter().enumerate() {
            let file = scratch.join(format!("layer-{}.audio", i));
            download_to_file(&self.client, &layer.audio_url, &file).await?;
            layer_files.push(file);
        }

        let info = probe_media(&video).await?;
        let params: Vec<(f64, f64)> = layers.iter().map(|l| (l.offset, l.volume)).collect();
        let graph = MixGraph::build(info.has_audio, &params)?;
        debug!(filter = %graph.filter, "Built mix graph");

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        mix_command(&video, &layer_files, &graph, output).run().await?;

        info!(
            layers = layers.len(),
            base_audio = info.has_audio,
            output = %output.display(),
            "Mixed sound layers onto clip"
        );
        Ok(())
    }
}
