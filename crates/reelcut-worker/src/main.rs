//! Clipping worker binary. Runs exactly one job and exits.

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read as _;
use tracing::{info, Instrument};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_models::{ProcessVideoJob, ReanalyzeJob, SoundJob};
use reelcut_worker::{apply_sound_action, process_video_job, reanalyze_job, JobContext, JobLogger, WorkerConfig};

#[derive(Debug, Parser)]
#[command(name = "reelcut-worker", version, about = "Run one clipping pipeline job")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process an uploaded video into clips
    Process(PayloadArgs),
    /// Replace a completed video's clips using reviewer feedback
    Reanalyze(PayloadArgs),
    /// Run one sound operation on a clip
    Sound(PayloadArgs),
    /// Print the JSON schema of a job payload
    Schema {
        #[arg(value_enum)]
        kind: PayloadKind,
    },
}

#[derive(Debug, clap::Args)]
struct PayloadArgs {
    /// Job payload as JSON; read from stdin when omitted
    #[arg(long, env = "JOB_PAYLOAD")]
    payload: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PayloadKind {
    Process,
    Reanalyze,
    Sound,
}

impl PayloadArgs {
    fn parse<T: serde::de::DeserializeOwned>(&self) -> anyhow::Result<T> {
        let raw = match &self.payload {
            Some(raw) => raw.clone(),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read job payload from stdin")?;
                buf
            }
        };
        serde_json::from_str(&raw).context("invalid job payload")
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelcut=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Command::Schema { kind } => {
            let schema = match kind {
                PayloadKind::Process => schemars::schema_for!(ProcessVideoJob),
                PayloadKind::Reanalyze => schemars::schema_for!(ReanalyzeJob),
                PayloadKind::Sound => schemars::schema_for!(SoundJob),
            };
            return print_json(&schema);
        }
        command => command,
    };

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(work_dir = %config.work_dir, "Starting reelcut-worker");

    match command {
        Command::Process(args) => {
            let job: ProcessVideoJob = args.parse()?;
            let needs_audio = job.auto_sfx || config.auto_sfx;
            let ctx = JobContext::from_env(config, needs_audio).await?;
            let span = JobLogger::new(&job.job_id, "process_video", job.video_id.as_str()).create_span();
            let clips = process_video_job(&ctx, &job).instrument(span).await?;
            print_json(&clips)
        }
        Command::Reanalyze(args) => {
            let job: ReanalyzeJob = args.parse()?;
            let ctx = JobContext::from_env(config, false).await?;
            let span = JobLogger::new(&job.job_id, "reanalyze", job.video_id.as_str()).create_span();
            let clips = reanalyze_job(&ctx, &job).instrument(span).await?;
            print_json(&clips)
        }
        Command::Sound(args) => {
            let job: SoundJob = args.parse()?;
            let ctx = JobContext::from_env(config, true).await?;
            let logger = JobLogger::new(&job.job_id, "sound", job.clip_id.as_str());
            logger.log_start(job.action.name());
            let result = apply_sound_action(&ctx, &job.clip_id, &job.action, &logger)
                .instrument(logger.create_span())
                .await;
            match result {
                Ok(clip) => {
                    logger.log_completion(job.action.name());
                    print_json(&clip)
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    Err(e.into())
                }
            }
        }
        Command::Schema { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("Job failed: {:#}", e);
        std::process::exit(1);
    }
}
