//! External tool runner and FFmpeg command builder.
//!
//! Every ffmpeg/ffprobe invocation goes through [`run_tool`], which captures
//! stdout and stderr and turns a non-zero exit into [`MediaError::ToolFailed`]
//! carrying the tail of stderr for diagnostics.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Number of stderr lines kept in errors and logs.
pub const STDERR_TAIL_LINES: usize = 20;

/// Captured output of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `STDERR_TAIL_LINES` lines of stderr.
    pub fn stderr_tail(&self) -> String {
        tail_lines(&self.stderr, STDERR_TAIL_LINES)
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Locate a tool on PATH.
pub fn locate(tool: &str) -> MediaResult<PathBuf> {
    which::which(tool).map_err(|_| match tool {
        "ffprobe" => MediaError::FfprobeNotFound,
        _ => MediaError::FfmpegNotFound,
    })
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    locate("ffmpeg")
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    locate("ffprobe")
}

/// Run an external tool to completion.
///
/// A non-zero exit is returned as an error; spawn failures map to
/// [`MediaError::SpawnFailed`]. The optional timeout kills the child.
pub async fn run_tool(tool: &str, args: &[String], timeout: Option<Duration>) -> MediaResult<ToolOutput> {
    let program = locate(tool)?;
    debug!(tool, "Running: {} {}", tool, args.join(" "));

    let started = Instant::now();
    let child = Command::new(&program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| {
            record_run(tool, "spawn_failed", started);
            MediaError::SpawnFailed {
                tool: tool.to_string(),
                source,
            }
        })?;

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                // kill_on_drop reaps the child once the future is dropped
                warn!(tool, "Timed out after {}s", limit.as_secs());
                record_run(tool, "timeout", started);
                return Err(MediaError::Timeout(limit.as_secs()));
            }
        },
        None => child.wait_with_output().await?,
    };

    let result = ToolOutput {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if result.success() {
        record_run(tool, "ok", started);
        Ok(result)
    } else {
        record_run(tool, "failed", started);
        let tail = result.stderr_tail();
        warn!(tool, exit_code = ?result.exit_code, "Tool exited non-zero: {}", tail);
        Err(MediaError::tool_failed(
            tool,
            format!("exited with status {:?}", result.exit_code),
            Some(tail),
            result.exit_code,
        ))
    }
}

fn record_run(tool: &str, outcome: &'static str, started: Instant) {
    metrics::counter!(
        "reelcut_media_tool_runs_total",
        "tool" => tool.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("reelcut_media_tool_duration_seconds", "tool" => tool.to_string())
        .record(started.elapsed().as_secs_f64());
}

/// One ffmpeg input with its own pre-input arguments.
#[derive(Debug, Clone)]
struct Input {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands with any number of inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<Input>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Single-input command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self::with_output(output).input(input)
    }

    /// Command with no inputs yet.
    pub fn with_output(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Append a file input.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(Input {
            args: Vec::new(),
            source: path.as_ref().to_string_lossy().into_owned(),
        });
        self
    }

    /// Append an input preceded by `-ss`/`-t` so seeking happens before decoding.
    pub fn input_segment(mut self, path: impl AsRef<Path>, start: f64, duration: f64) -> Self {
        self.inputs.push(Input {
            args: vec![
                "-ss".to_string(),
                format!("{:.3}", start),
                "-t".to_string(),
                format!("{:.3}", duration),
            ],
            source: path.as_ref().to_string_lossy().into_owned(),
        });
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    pub fn map(self, stream: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(stream)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());

        args
    }

    pub async fn run(&self) -> MediaResult<ToolOutput> {
        if self.inputs.is_empty() {
            return Err(MediaError::invalid_input("ffmpeg command has no inputs"));
        }
        run_tool("ffmpeg", &self.build_args(), None).await
    }
}
