//! Replacing a completed video's clip set using reviewer feedback.
//!
//! Selection runs first and touches nothing. Only an accepted selection goes
//! on to cutting and publishing, and publishing swaps the whole clip set in
//! one transaction, so a failure at any point leaves the previous clips
//! exactly as they were.

use validator::Validate;

use reelcut_models::{Clip, ReanalyzeJob, VideoStatus};

use crate::boundary::BoundaryMapper;
use crate::context::JobContext;
use crate::cutter::cut_all;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::pipeline::load_video;
use crate::publisher::publish_clip_set;
use crate::selector::{target_clip_count, ClipSelector, TextSelection};
use crate::source::fetch_source;

pub async fn reanalyze_job(ctx: &JobContext, job: &ReanalyzeJob) -> WorkerResult<Vec<Clip>> {
    job.validate()
        .map_err(|e| WorkerError::invalid_job(e.to_string()))?;

    let logger = JobLogger::new(&job.job_id, "reanalyze", job.video_id.as_str());
    logger.log_start("Starting re-analysis");

    let result = run(ctx, job, &logger).await;
    match &result {
        Ok(clips) => logger.log_completion(&format!("Replaced clip set with {} clips", clips.len())),
        Err(e) => logger.log_error(&format!("Re-analysis failed, previous clips kept: {}", e)),
    }
    result
}

async fn run(ctx: &JobContext, job: &ReanalyzeJob, logger: &JobLogger) -> WorkerResult<Vec<Clip>> {
    let video = load_video(ctx, &job.video_id).await?;
    if video.status != VideoStatus::Completed {
        return Err(WorkerError::invalid_job(format!(
            "video {} is {}; only completed videos can be re-analyzed",
            video.id, video.status
        )));
    }
    let transcript = video
        .transcript
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| WorkerError::invalid_job(format!("video {} has no transcript", video.id)))?;
    let duration = video
        .duration_seconds
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| WorkerError::invalid_job(format!("video {} has no duration", video.id)))?;

    let existing = ctx.store.list_clips(&video.id).await?;
    let shot_timestamps = video.shot_timestamps.clone().unwrap_or_default();

    let selected = ClipSelector::new(ctx.model.clone(), &ctx.config)
        .select_from_text(&TextSelection {
            transcript,
            duration,
            shot_timestamps: &shot_timestamps,
            existing: &existing,
            feedback: &job.feedback,
            guidance: video.edit_guidance.as_ref(),
            target_count: target_clip_count(duration),
        })
        .await?;
    logger.log_stage(
        "selection",
        &format!("Selected {} clips to replace {}", selected.len(), existing.len()),
    );

    let source = fetch_source(ctx, &video).await?;
    let silences = ctx.media.detect_silence(&source.path, Some(duration)).await?;
    let planned = BoundaryMapper {
        transcript: None,
        silences: &silences,
        tolerance: ctx.config.snap_tolerance,
        duration,
    }
    .map(&selected)?;

    let cut = cut_all(ctx.media.as_ref(), &source.path, source.scratch(), planned, logger).await?;
    publish_clip_set(ctx, &video, cut, logger).await
}
