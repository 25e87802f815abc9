//! Audio extraction for transcription uploads.

use std::path::Path;
use tracing::info;

use reelcut_models::encoding::{
    TRANSCRIPTION_AUDIO_BITRATE, TRANSCRIPTION_AUDIO_CODEC, TRANSCRIPTION_SAMPLE_RATE,
};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};

/// Build the extraction command: mono 16 kHz Opus in an Ogg container.
pub fn extract_audio_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .output_args(["-ac", "1", "-ar"])
        .output_arg(TRANSCRIPTION_SAMPLE_RATE.to_string())
        .audio_codec(TRANSCRIPTION_AUDIO_CODEC)
        .audio_bitrate(TRANSCRIPTION_AUDIO_BITRATE)
        .output_args(["-f", "ogg"])
}

/// Transcode a video's audio track to a compact file for the transcriber.
pub async fn extract_audio(input: impl AsRef<Path>, output: impl AsRef<Path>) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    extract_audio_command(input, output).run().await?;

    let size = tokio::fs::metadata(output).await?.len();
    info!(output = %output.display(), bytes = size, "Extracted audio for transcription");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_args() {
        let args = extract_audio_command(Path::new("in.mp4"), Path::new("out.ogg")).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-vn"));
        assert!(joined.contains("-ac 1 -ar 16000"));
        assert!(joined.contains("-c:a libopus -b:a 32k"));
        assert!(joined.ends_with("-f ogg out.ogg"));
    }
}
