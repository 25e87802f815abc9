//! Silence detection via ffmpeg's `silencedetect` audio filter.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use reelcut_models::SilenceInterval;

use crate::command::run_tool;
use crate::error::{MediaError, MediaResult};

/// Thresholds for the silence detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SilenceConfig {
    /// Noise floor in dB; quieter audio counts as silence
    pub noise_db: f64,
    /// Shortest stretch reported, in seconds
    pub min_duration: f64,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            noise_db: -30.0,
            min_duration: 0.5,
        }
    }
}

impl SilenceConfig {
    pub fn filter(&self) -> String {
        format!("silencedetect=noise={}dB:d={}", self.noise_db, self.min_duration)
    }
}

static EVENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"silence_(start|end):\s*(-?[0-9]+(?:\.[0-9]+)?)").expect("valid regex")
});

/// Scan a media file's audio for silent stretches, in order.
///
/// `total_duration` closes a silence that is still open at end of file.
pub async fn detect_silence(
    path: impl AsRef<Path>,
    config: &SilenceConfig,
    total_duration: Option<f64>,
) -> MediaResult<Vec<SilenceInterval>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let args = vec![
        "-hide_banner".to_string(),
        "-nostats".to_string(),
        "-i".to_string(),
        path.to_string_lossy().into_owned(),
        "-vn".to_string(),
        "-af".to_string(),
        config.filter(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ];
    let output = run_tool("ffmpeg", &args, None).await?;
    let intervals = parse_silencedetect(&output.stderr, total_duration);
    debug!(count = intervals.len(), "Detected silence intervals");
    Ok(intervals)
}

/// Pair up `silence_start` / `silence_end` events from ffmpeg stderr.
pub fn parse_silencedetect(stderr: &str, total_duration: Option<f64>) -> Vec<SilenceInterval> {
    let mut intervals = Vec::new();
    let mut open: Option<f64> = None;

    for caps in EVENT_RE.captures_iter(stderr) {
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };
        match &caps[1] {
            "start" => open = Some(value.max(0.0)),
            _ => {
                if let Some(start) = open.take() {
                    if value > start {
                        intervals.push(SilenceInterval::new(start, value));
                    }
                }
            }
        }
    }

    if let (Some(start), Some(end)) = (open, total_duration) {
        if end > start {
            intervals.push(SilenceInterval::new(start, end));
        }
    }

    intervals
}

#[cfg(test)]
mod tests {
    use super::*;

    const STDERR: &str = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':
[silencedetect @ 0x55d1c0] silence_start: 0
[silencedetect @ 0x55d1c0] silence_end: 1.2345 | silence_duration: 1.2345
[silencedetect @ 0x55d1c0] silence_start: 10.5
[silencedetect @ 0x55d1c0] silence_end: 11.25 | silence_duration: 0.75
[silencedetect @ 0x55d1c0] silence_start: 58.9
";

    #[test]
    fn test_parse_pairs_events() {
        let intervals = parse_silencedetect(STDERR, None);
        assert_eq!(
            intervals,
            vec![
                SilenceInterval::new(0.0, 1.2345),
                SilenceInterval::new(10.5, 11.25),
            ]
        );
    }

    #[test]
    fn test_trailing_silence_closed_by_duration() {
        let intervals = parse_silencedetect(STDERR, Some(60.0));
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[2], SilenceInterval::new(58.9, 60.0));
    }

    #[test]
    fn test_negative_start_clamped() {
        let text = "silence_start: -0.01\nsilence_end: 0.8 | silence_duration: 0.81";
        assert_eq!(parse_silencedetect(text, None), vec![SilenceInterval::new(0.0, 0.8)]);
    }

    #[test]
    fn test_filter_string() {
        assert_eq!(SilenceConfig::default().filter(), "silencedetect=noise=-30dB:d=0.5");
    }
}
