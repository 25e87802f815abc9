//! Frame-accurate clip cutting.

use std::path::Path;
use tracing::info;

use reelcut_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Build the cut command. Input-side seeking plus a re-encode keeps the
/// first frame exact.
pub fn cut_command(
    input: &Path,
    output: &Path,
    start: f64,
    duration: f64,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::with_output(output)
        .input_segment(input, start, duration)
        .output_args(encoding.to_ffmpeg_args())
}

/// Cut `[start, start + duration)` out of `input` into a standalone file.
pub async fn cut_clip(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: f64,
    duration: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if !start.is_finite() || start < 0.0 || !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::invalid_input(format!(
            "invalid cut window start={} duration={}",
            start, duration
        )));
    }

    if let Some(parent) = output.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(
        "Cutting clip: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        input.display(),
        output.display(),
        start,
        duration
    );

    cut_command(input, output, start, duration, encoding).run().await?;

    if !output.exists() {
        return Err(MediaError::tool_failed(
            "ffmpeg",
            "cut produced no output file",
            None,
            Some(0),
        ));
    }
    Ok(())
}
