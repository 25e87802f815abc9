//! Video-to-clips processing job.
//!
//! One run takes a video from its upload to a published, ranked clip set:
//! resolve and download the source, probe it, fan out transcription, shot
//! detection and silence detection, select clips with the generative model,
//! snap the boundaries, cut, publish. Each stage records its status before
//! the next begins. Any failure marks the video `failed` with a classified
//! message; a rerun starts from scratch.

use tracing::info;
use validator::Validate;

use reelcut_models::{Clip, ProcessVideoJob, ShotBoundary, SoundAction, Transcript, Video, VideoId, VideoStatus};

use crate::boundary::BoundaryMapper;
use crate::context::JobContext;
use crate::cutter::cut_all;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::publisher::publish_clip_set;
use crate::selector::{target_clip_count, ClipSelector, VideoSelection};
use crate::sound::apply_sound_action;
use crate::source::fetch_source;

pub(crate) async fn load_video(ctx: &JobContext, id: &VideoId) -> WorkerResult<Video> {
    ctx.store
        .get_video(id)
        .await?
        .ok_or_else(|| WorkerError::not_found(format!("video {}", id)))
}

async fn set_status(ctx: &JobContext, video_id: &VideoId, status: VideoStatus, logger: &JobLogger) -> WorkerResult<()> {
    ctx.store.update_status(video_id, status, None).await?;
    logger.log_stage(status.as_str(), &format!("Video is {}", status));
    Ok(())
}

/// Move the video into `processing`, restarting runs that never finished.
async fn begin(ctx: &JobContext, video: &Video, logger: &JobLogger) -> WorkerResult<()> {
    match video.status {
        VideoStatus::Completed => Err(WorkerError::invalid_job(format!(
            "video {} is already completed; request a re-analysis instead",
            video.id
        ))),
        status if status.is_in_flight() => {
            logger.log_warning(&format!("Previous run stopped at {}, restarting from scratch", status));
            ctx.store
                .update_status(
                    &video.id,
                    VideoStatus::Failed,
                    Some(format!("previous run interrupted while {}", status)),
                )
                .await?;
            set_status(ctx, &video.id, VideoStatus::Processing, logger).await
        }
        _ => set_status(ctx, &video.id, VideoStatus::Processing, logger).await,
    }
}

async fn mark_failed(ctx: &JobContext, video_id: &VideoId, error: &WorkerError, logger: &JobLogger) {
    logger.log_error(&error.to_string());
    if let Err(e) = ctx
        .store
        .update_status(video_id, VideoStatus::Failed, Some(error.status_message()))
        .await
    {
        logger.log_warning(&format!("Could not record failure on video: {}", e));
    }
}

/// Run the full ingest pipeline for one video.
pub async fn process_video_job(ctx: &JobContext, job: &ProcessVideoJob) -> WorkerResult<Vec<Clip>> {
    job.validate()
        .map_err(|e| WorkerError::invalid_job(e.to_string()))?;

    let logger = JobLogger::new(&job.job_id, "process_video", job.video_id.as_str());
    logger.log_start("Starting video processing");

    let video = load_video(ctx, &job.video_id).await?;
    if video.project_id != job.project_id {
        return Err(WorkerError::invalid_job(format!(
            "video {} belongs to project {}, not {}",
            video.id, video.project_id, job.project_id
        )));
    }
    begin(ctx, &video, &logger).await?;

    let clips = match run_stages(ctx, job, &video, &logger).await {
        Ok(clips) => clips,
        Err(e) => {
            mark_failed(ctx, &video.id, &e, &logger).await;
            return Err(e);
        }
    };

    logger.log_completion(&format!("Published {} clips", clips.len()));

    if job.auto_sfx || ctx.config.auto_sfx {
        add_auto_sfx(ctx, &clips, &logger).await;
    }
    Ok(clips)
}

async fn run_stages(
    ctx: &JobContext,
    job: &ProcessVideoJob,
    video: &Video,
    logger: &JobLogger,
) -> WorkerResult<Vec<Clip>> {
    let source = fetch_source(ctx, video).await?;

    let info = ctx.media.probe(&source.path).await?;
    if !info.duration.is_finite() || info.duration <= 0.0 {
        return Err(WorkerError::invalid_job(format!("source {} has no playable duration", source.object)));
    }
    let duration = ctx.store.set_duration_once(&video.id, info.duration).await?;
    logger.log_stage("probe", &format!("Source is {:.1}s, audio: {}", duration, info.has_audio));

    set_status(ctx, &video.id, VideoStatus::Transcribing, logger).await?;

    let audio_path = source.scratch().join("audio.ogg");
    let remote = source.remote_ref();
    let transcribe = async {
        ctx.media.extract_audio(&source.path, &audio_path).await?;
        Ok::<Transcript, WorkerError>(ctx.transcriber.transcribe(&audio_path).await?)
    };
    let shots = async { Ok::<Vec<ShotBoundary>, WorkerError>(ctx.shots.detect_shots(&remote).await?) };
    let silences = async { Ok::<_, WorkerError>(ctx.media.detect_silence(&source.path, Some(duration)).await?) };
    let (transcript, shots, silences) = tokio::try_join!(transcribe, shots, silences)?;

    ctx.store.set_transcript(&video.id, &transcript.text).await?;
    let shot_timestamps = ShotBoundary::cut_points(&shots);
    ctx.store.set_shot_timestamps(&video.id, &shot_timestamps).await?;
    logger.log_stage(
        "analysis",
        &format!(
            "{} words, {} shot changes, {} silences",
            transcript.word_count(),
            shot_timestamps.len(),
            silences.len()
        ),
    );

    set_status(ctx, &video.id, VideoStatus::Selecting, logger).await?;

    let target_count = target_clip_count(duration);
    let media = ctx.model.upload_media(&source.path, source.mime_type()).await?;
    let selection = ClipSelector::new(ctx.model.clone(), &ctx.config)
        .select_from_video(&VideoSelection {
            media: &media,
            transcript: &transcript,
            duration,
            script: job.script_text.as_deref(),
            guidance: video.edit_guidance.as_ref(),
            target_count,
        })
        .await;
    if let Err(e) = ctx.model.delete_media(&media).await {
        logger.log_warning(&format!("Failed to delete uploaded video {}: {}", media.name, e));
    }
    let selected = selection?;
    logger.log_stage(
        "selection",
        &format!("Selected {} clips (target {})", selected.len(), target_count),
    );

    let planned = BoundaryMapper {
        transcript: Some(&transcript),
        silences: &silences,
        tolerance: ctx.config.snap_tolerance,
        duration,
    }
    .map(&selected)?;

    set_status(ctx, &video.id, VideoStatus::Cutting, logger).await?;

    let cut = cut_all(ctx.media.as_ref(), &source.path, source.scratch(), planned, logger).await?;
    let clips = publish_clip_set(ctx, video, cut, logger).await?;

    set_status(ctx, &video.id, VideoStatus::Completed, logger).await?;
    Ok(clips)
}

/// Generate sound effects for freshly published clips. Failures are logged.
async fn add_auto_sfx(ctx: &JobContext, clips: &[Clip], logger: &JobLogger) {
    if ctx.audio.is_none() {
        logger.log_warning("Automatic sound effects requested but audio generation is not configured");
        return;
    }

    let action = SoundAction::GenerateSfx { max_items: None };
    let mut done = 0usize;
    for clip in clips {
        match apply_sound_action(ctx, &clip.id, &action, logger).await {
            Ok(_) => done += 1,
            Err(e) => logger.log_warning(&format!("Sound effects for clip {} failed: {}", clip.id, e)),
        }
    }
    info!(clips = clips.len(), with_sfx = done, "Automatic sound effects finished");
}
