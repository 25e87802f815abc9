//! End-to-end runs of the processing job against in-process fakes.

mod common;

use serde_json::json;

use common::*;
use reelcut_firestore::VideoStore;
use reelcut_models::{ProcessVideoJob, SilenceInterval, VideoStatus};
use reelcut_worker::{process_video_job, ErrorKind, WorkerError};

const DURATION: f64 = 720.0;
const WORDS: usize = 2000;

fn silences() -> Vec<SilenceInterval> {
    [
        (35.0, 35.7),
        (108.2, 108.9),
        (143.1, 143.6),
        (234.3, 235.0),
        (323.0, 323.5),
        (396.2, 397.0),
        (539.2, 539.7),
        (648.4, 649.0),
    ]
    .into_iter()
    .map(|(s, e)| SilenceInterval::new(s, e))
    .collect()
}

fn four_clips() -> serde_json::Value {
    json!({
        "clips": [
            word_clip(100, 299, 2, 8.0, "The Big Mistake"),
            word_clip(400, 649, 1, 9.0, "Nobody Tells You This"),
            word_clip(900, 1099, 3, 7.0, "Three Rules"),
            word_clip(1500, 1799, 4, 6.5, "The Ending"),
        ]
    })
}

fn inverted() -> serde_json::Value {
    json!({ "clips": [word_clip(120, 90, 1, 8.0, "Backwards")] })
}

fn harness(answers: Vec<serde_json::Value>) -> Harness {
    Harness::new(
        FakeMedia::new(DURATION, silences()),
        FakeModel::new(answers),
        transcript(WORDS, DURATION),
    )
}

const FULL_RUN: [VideoStatus; 5] = [
    VideoStatus::Processing,
    VideoStatus::Transcribing,
    VideoStatus::Selecting,
    VideoStatus::Cutting,
    VideoStatus::Completed,
];

#[tokio::test]
async fn test_happy_path_publishes_four_snapped_clips() {
    let h = harness(vec![four_clips()]);
    let video = h.seed_video(VideoStatus::Pending).await;

    let clips = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap();
    assert_eq!(clips.len(), 4);

    assert_eq!(h.store.status_history(&video.id), FULL_RUN.to_vec());
    let stored = h.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Completed);
    assert_eq!(stored.duration_seconds, Some(DURATION));
    assert_eq!(stored.shot_timestamps, Some(vec![95.0]));
    assert!(stored.transcript.unwrap().starts_with("w0 w1"));

    let mut persisted = h.store.list_clips(&video.id).await.unwrap();
    assert_eq!(persisted.len(), 4);
    persisted.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));

    let spans: Vec<(f64, f64)> = persisted.iter().map(|c| (c.start_time(), c.end_time())).collect();
    assert_eq!(
        spans,
        vec![(35.7, 108.2), (143.6, 234.3), (323.5, 396.2), (539.7, 648.4)]
    );
    for pair in persisted.windows(2) {
        assert!(pair[0].end_time() <= pair[1].start_time());
    }
    for clip in &persisted {
        assert!((clip.duration() - (clip.end_time() - clip.start_time())).abs() < 1e-3);
        let key = clip.storage_path.as_deref().unwrap();
        assert!(key.starts_with(&format!("proj1/{}/", video.id)));
        assert!(h.objects.contains(PROCESSED_BUCKET, key));
        assert_eq!(clip.public_url.as_deref(), Some(format!("https://cdn.test/{}", key).as_str()));
    }

    let mut ranks: Vec<(u32, String)> = persisted
        .iter()
        .map(|c| (c.strategic_rank, c.title.clone()))
        .collect();
    ranks.sort();
    assert_eq!(ranks[0], (1, "Nobody Tells You This".to_string()));
    assert_eq!(ranks.iter().map(|r| r.0).collect::<Vec<_>>(), vec![1, 2, 3, 4]);

    assert_eq!(h.model.calls(), 1);
    assert_eq!(h.model.deletes.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(h.model.prompts.lock().unwrap()[0].contains("Select exactly 4 clips"));
    assert_eq!(h.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_invalid_first_answer_is_retried() {
    let h = harness(vec![inverted(), four_clips()]);
    let video = h.seed_video(VideoStatus::Pending).await;

    let clips = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap();

    assert_eq!(clips.len(), 4);
    assert_eq!(h.model.calls(), 2);
    assert_eq!(h.store.status_history(&video.id).last(), Some(&VideoStatus::Completed));
}

#[tokio::test]
async fn test_two_invalid_answers_fail_the_video() {
    let h = harness(vec![inverted(), inverted(), four_clips()]);
    let video = h.seed_video(VideoStatus::Pending).await;

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert_eq!(h.model.calls(), 2);

    let stored = h.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Failed);
    assert!(stored.error_message.unwrap().starts_with("[validation_failure]"));
    assert_eq!(h.store.clip_count(), 0);
    assert_eq!(h.model.deletes.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(h.leftover_scratch(), 0);
}

#[tokio::test]
async fn test_cut_failure_attempts_every_clip_then_fails() {
    let mut media = FakeMedia::new(DURATION, silences());
    media.failing_cuts.insert(2);
    let h = Harness::new(media, FakeModel::new(vec![four_clips()]), transcript(WORDS, DURATION));
    let video = h.seed_video(VideoStatus::Pending).await;

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap_err();

    match err {
        WorkerError::CutsFailed { failed, total, .. } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 4);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(h.media.cut_calls.load(std::sync::atomic::Ordering::SeqCst), 4);
    assert_eq!(h.store.clip_count(), 0);
    assert!(h.objects.keys(PROCESSED_BUCKET).is_empty());

    let stored = h.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Failed);
    assert!(stored.error_message.unwrap().starts_with("[subprocess_failure]"));
}

#[tokio::test]
async fn test_interrupted_run_restarts_from_scratch() {
    let h = harness(vec![four_clips()]);
    let video = h.seed_video(VideoStatus::Selecting).await;

    process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap();

    let mut expected = vec![VideoStatus::Failed];
    expected.extend(FULL_RUN);
    assert_eq!(h.store.status_history(&video.id), expected);
}

#[tokio::test]
async fn test_failed_video_can_be_retried() {
    let h = harness(vec![four_clips()]);
    let video = h.seed_video(VideoStatus::Failed).await;

    process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap();
    assert_eq!(h.store.status_history(&video.id), FULL_RUN.to_vec());
}

#[tokio::test]
async fn test_completed_video_is_not_reprocessed() {
    let h = harness(vec![four_clips()]);
    let video = h.seed_video(VideoStatus::Completed).await;

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::InvalidJob(_)));
    assert!(h.store.status_history(&video.id).is_empty());
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_wrong_project_is_rejected_before_any_work() {
    let h = harness(vec![four_clips()]);
    let video = h.seed_video(VideoStatus::Pending).await;

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "other-project"))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::InvalidJob(_)));
    assert!(h.store.status_history(&video.id).is_empty());
}

#[tokio::test]
async fn test_missing_upload_fails_as_not_found() {
    let h = harness(vec![four_clips()]);
    let video = reelcut_models::Video::pending("proj1", "ghost.mp4", "proj1/ghost.mp4");
    h.store.create_video(&video).await.unwrap();

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    let stored = h.store.get_video(&video.id).await.unwrap().unwrap();
    assert_eq!(stored.status, VideoStatus::Failed);
}

#[tokio::test]
async fn test_short_transcript_fails_without_model_call() {
    let h = Harness::new(
        FakeMedia::new(30.0, Vec::new()),
        FakeModel::new(vec![four_clips()]),
        transcript(40, 30.0),
    );
    let video = h.seed_video(VideoStatus::Pending).await;

    let err = process_video_job(&h.ctx, &ProcessVideoJob::new(video.id.clone(), "proj1"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    assert_eq!(h.model.calls(), 0);
}

#[tokio::test]
async fn test_auto_sfx_decorates_published_clips() {
    let h = harness(vec![
        json!({ "clips": [word_clip(100, 299, 1, 8.0, "Only Clip")] }),
        json!({ "moments": [
            { "timestamp": 1.0, "label": "whoosh", "prompt": "fast whoosh", "duration": 1.2 },
            { "timestamp": 500.0, "label": "late", "prompt": "outside the clip", "duration": 1.0 }
        ] }),
    ]);
    let video = h.seed_video(VideoStatus::Pending).await;

    let mut job = ProcessVideoJob::new(video.id.clone(), "proj1");
    job.auto_sfx = true;
    let clips = process_video_job(&h.ctx, &job).await.unwrap();

    let clip = h.store.get_clip(&clips[0].id).await.unwrap().unwrap();
    assert_eq!(clip.sfx.len(), 1);
    assert_eq!(clip.sfx[0].timestamp, 1.0);
    assert_eq!(
        clip.mixed_video_url.as_deref(),
        Some(format!("https://cdn.test/sfx-videos/{}/output.mp4", clip.id).as_str())
    );
    assert_eq!(h.audio.requests.lock().unwrap().len(), 1);
}
