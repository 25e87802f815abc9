//! Clip selection: prompting the generative model and validating its answer.
//!
//! Model output is untrusted. It is parsed into loose wire types, checked
//! against the structural rules, and only then converted into
//! [`SelectedClip`]s carrying a typed [`ClipBoundary`]. A failed check or a
//! malformed answer triggers another model call within the attempt budget.

use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

use reelcut_ai::{response_schema, GenerativeModel, MediaRef, ModelPrompt};
use reelcut_models::timestamp::format_seconds;
use reelcut_models::{Clip, Transcript};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_bounded, RetryConfig};

/// Fewest transcript words a word-index clip may span.
pub const MIN_CLIP_WORDS: usize = 80;
/// Shortest timestamp clip, in seconds.
pub const MIN_CLIP_SECONDS: f64 = 10.0;
pub const MIN_TARGET_CLIPS: u32 = 3;
pub const MAX_TARGET_CLIPS: u32 = 15;

/// `clamp(round(minutes / 3), 3, 15)`
pub fn target_clip_count(duration_secs: f64) -> u32 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return MIN_TARGET_CLIPS;
    }
    let by_length = (duration_secs / 60.0 / 3.0).round() as u32;
    by_length.clamp(MIN_TARGET_CLIPS, MAX_TARGET_CLIPS)
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Model answer for the multimodal, word-index variant.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WordIndexResponse {
    pub clips: Vec<WordIndexCandidate>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WordIndexCandidate {
    /// Index of the first transcript word in the clip
    pub start_word_index: i64,
    /// Index of the last transcript word in the clip (inclusive)
    pub end_word_index: i64,
    pub title: String,
    pub hook: String,
    /// Viral potential from 1 to 10
    pub hook_score: f64,
    /// Suggested posting order, 1 = post first
    pub strategic_rank: i64,
    pub rationale: String,
}

/// Model answer for the text-only, timestamp variant.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TimestampResponse {
    pub clips: Vec<TimestampCandidate>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TimestampCandidate {
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
    pub title: String,
    pub hook: String,
    /// Viral potential from 1 to 10
    pub hook_score: f64,
    /// Suggested posting order, 1 = post first
    pub strategic_rank: i64,
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Validated output
// ---------------------------------------------------------------------------

/// Where a clip starts and ends, in the granularity the model answered in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClipBoundary {
    /// Inclusive transcript word range
    WordIndex { start: usize, end: usize },
    /// Source-video seconds
    Seconds { start: f64, end: f64 },
}

impl ClipBoundary {
    fn sort_key(&self) -> f64 {
        match *self {
            ClipBoundary::WordIndex { start, .. } => start as f64,
            ClipBoundary::Seconds { start, .. } => start,
        }
    }
}

/// A clip that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedClip {
    pub boundary: ClipBoundary,
    pub title: String,
    pub hook: String,
    pub hook_score: f64,
    /// Dense rank, 1..=n
    pub strategic_rank: u32,
    pub rationale: String,
}

struct Candidate {
    boundary: ClipBoundary,
    title: String,
    hook: String,
    hook_score: f64,
    model_rank: i64,
    rationale: String,
}

fn clean_text(value: &str, fallback: impl FnOnce() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback()
    } else {
        trimmed.to_string()
    }
}

impl Candidate {
    fn new(
        boundary: ClipBoundary,
        index: usize,
        title: &str,
        hook: &str,
        hook_score: f64,
        model_rank: i64,
        rationale: &str,
    ) -> Self {
        Self {
            boundary,
            title: clean_text(title, || format!("Clip {}", index + 1)),
            hook: hook.trim().to_string(),
            hook_score: if hook_score.is_finite() { hook_score } else { 0.0 },
            model_rank,
            rationale: rationale.trim().to_string(),
        }
    }
}

/// Validate a word-index answer against a transcript of `word_count` words.
pub fn validate_word_clips(raw: &[WordIndexCandidate], word_count: usize) -> WorkerResult<Vec<SelectedClip>> {
    if raw.is_empty() {
        return Err(WorkerError::validation("model returned no clips"));
    }

    let mut candidates = Vec::with_capacity(raw.len());
    for (i, c) in raw.iter().enumerate() {
        let (start, end) = (c.start_word_index, c.end_word_index);
        if start >= end {
            return Err(WorkerError::validation(format!(
                "clip {}: start word {} is not before end word {}",
                i + 1,
                start,
                end
            )));
        }
        if start < 0 || end as u64 >= word_count as u64 {
            return Err(WorkerError::validation(format!(
                "clip {}: words {}..={} outside transcript of {} words",
                i + 1,
                start,
                end,
                word_count
            )));
        }
        let words = (end - start + 1) as usize;
        if words < MIN_CLIP_WORDS {
            return Err(WorkerError::validation(format!(
                "clip {}: {} words, minimum is {}",
                i + 1,
                words,
                MIN_CLIP_WORDS
            )));
        }
        candidates.push(Candidate::new(
            ClipBoundary::WordIndex {
                start: start as usize,
                end: end as usize,
            },
            i,
            &c.title,
            &c.hook,
            c.hook_score,
            c.strategic_rank,
            &c.rationale,
        ));
    }

    finish(candidates)
}

/// Validate a timestamp answer against a video of `duration` seconds.
pub fn validate_timestamp_clips(raw: &[TimestampCandidate], duration: f64) -> WorkerResult<Vec<SelectedClip>> {
    if raw.is_empty() {
        return Err(WorkerError::validation("model returned no clips"));
    }

    let mut candidates = Vec::with_capacity(raw.len());
    for (i, c) in raw.iter().enumerate() {
        let (start, end) = (c.start_time_seconds, c.end_time_seconds);
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(WorkerError::validation(format!(
                "clip {}: start {:.3}s is not before end {:.3}s",
                i + 1,
                start,
                end
            )));
        }
        if start < 0.0 || end > duration {
            return Err(WorkerError::validation(format!(
                "clip {}: {:.3}s-{:.3}s outside video of {:.3}s",
                i + 1,
                start,
                end,
                duration
            )));
        }
        if end - start < MIN_CLIP_SECONDS {
            return Err(WorkerError::validation(format!(
                "clip {}: {:.3}s long, minimum is {}s",
                i + 1,
                end - start,
                MIN_CLIP_SECONDS
            )));
        }
        candidates.push(Candidate::new(
            ClipBoundary::Seconds { start, end },
            i,
            &c.title,
            &c.hook,
            c.hook_score,
            c.strategic_rank,
            &c.rationale,
        ));
    }

    finish(candidates)
}

/// Reject overlaps, then rank densely by model rank, hook score and start.
fn finish(mut candidates: Vec<Candidate>) -> WorkerResult<Vec<SelectedClip>> {
    candidates.sort_by(|a, b| a.boundary.sort_key().total_cmp(&b.boundary.sort_key()));
    for pair in candidates.windows(2) {
        let overlapping = match (pair[0].boundary, pair[1].boundary) {
            (ClipBoundary::WordIndex { end, .. }, ClipBoundary::WordIndex { start, .. }) => end >= start,
            (ClipBoundary::Seconds { end, .. }, ClipBoundary::Seconds { start, .. }) => end > start,
            _ => true,
        };
        if overlapping {
            return Err(WorkerError::validation(format!(
                "clips \"{}\" and \"{}\" overlap",
                pair[0].title, pair[1].title
            )));
        }
    }

    candidates.sort_by(|a, b| {
        a.model_rank
            .cmp(&b.model_rank)
            .then(b.hook_score.total_cmp(&a.hook_score))
            .then(a.boundary.sort_key().total_cmp(&b.boundary.sort_key()))
    });

    Ok(candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| SelectedClip {
            boundary: c.boundary,
            title: c.title,
            hook: c.hook,
            hook_score: c.hook_score,
            strategic_rank: i as u32 + 1,
            rationale: c.rationale,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

const SELECTION_PROMPT: &str = r#"You are a viral short-form video editor. Watch the attached video and read its transcript, then choose the segments that will perform best as standalone TikTok, YouTube Shorts and Instagram Reels clips.

Each transcript word is prefixed with its index, for example "[42] word". Express every clip as an inclusive word range using those indices.

Rules:
- start_word_index must be smaller than end_word_index
- every clip must contain at least 80 words
- clips must not overlap
- each clip must make sense without the rest of the video: open on a strong hook, end on a complete thought
- prefer cuts at natural pauses and sentence boundaries
- strategic_rank is the posting order (1 = post first); hook_score rates attention-grabbing potential from 1 to 10"#;

const REANALYSIS_PROMPT: &str = r#"You are a viral short-form video editor revising a set of clips cut from a longer video. The creator has reviewed the current clips and left feedback. Propose a replacement set that addresses the feedback.

Express every clip in source-video seconds.

Rules:
- start_time_seconds must be smaller than end_time_seconds
- every clip must be at least 10 seconds long and lie inside the video
- clips must not overlap
- prefer boundaries at the listed shot changes or at natural pauses
- strategic_rank is the posting order (1 = post first); hook_score rates attention-grabbing potential from 1 to 10"#;

fn push_guidance(prompt: &mut String, script: Option<&str>, guidance: Option<&serde_json::Value>) {
    if let Some(script) = script.map(str::trim).filter(|s| !s.is_empty()) {
        let _ = write!(prompt, "\n\nThe video was recorded from this script:\n{}", script);
    }
    if let Some(guidance) = guidance.filter(|g| !g.is_null()) {
        let _ = write!(prompt, "\n\nCreator guidance (follow it where possible):\n{}", guidance);
    }
}

/// Inputs for selecting clips from the full video.
#[derive(Debug, Clone, Copy)]
pub struct VideoSelection<'a> {
    pub media: &'a MediaRef,
    pub transcript: &'a Transcript,
    pub duration: f64,
    pub script: Option<&'a str>,
    pub guidance: Option<&'a serde_json::Value>,
    pub target_count: u32,
}

impl VideoSelection<'_> {
    pub fn prompt_text(&self) -> String {
        let mut prompt = SELECTION_PROMPT.to_string();
        let _ = write!(
            prompt,
            "\n\nThe video is {} long ({:.1} seconds). Select exactly {} clips.",
            format_seconds(self.duration),
            self.duration,
            self.target_count
        );
        push_guidance(&mut prompt, self.script, self.guidance);
        let _ = write!(
            prompt,
            "\n\nTranscript ({} words):\n{}",
            self.transcript.word_count(),
            self.transcript.indexed_text()
        );
        prompt
    }
}

/// Inputs for re-selecting clips from text with reviewer feedback.
#[derive(Debug, Clone, Copy)]
pub struct TextSelection<'a> {
    pub transcript: &'a str,
    pub duration: f64,
    pub shot_timestamps: &'a [f64],
    pub existing: &'a [Clip],
    pub feedback: &'a str,
    pub guidance: Option<&'a serde_json::Value>,
    pub target_count: u32,
}

impl TextSelection<'_> {
    pub fn prompt_text(&self) -> String {
        let mut prompt = REANALYSIS_PROMPT.to_string();
        let _ = write!(
            prompt,
            "\n\nThe video is {} long ({:.1} seconds). Select {} clips.",
            format_seconds(self.duration),
            self.duration,
            self.target_count
        );

        if !self.shot_timestamps.is_empty() {
            let shots: Vec<String> = self.shot_timestamps.iter().map(|t| format!("{:.2}", t)).collect();
            let _ = write!(prompt, "\n\nShot changes (seconds): {}", shots.join(", "));
        }

        prompt.push_str("\n\nCurrent clips:");
        for clip in self.existing {
            let _ = write!(
                prompt,
                "\n- #{} \"{}\" {:.2}s-{:.2}s, hook score {:.1}: {}",
                clip.strategic_rank,
                clip.title,
                clip.start_time(),
                clip.end_time(),
                clip.hook_score,
                clip.rationale
            );
        }

        let _ = write!(prompt, "\n\nCreator feedback:\n{}", self.feedback.trim());
        push_guidance(&mut prompt, None, self.guidance);
        let _ = write!(prompt, "\n\nTranscript:\n{}", self.transcript);
        prompt
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

pub struct ClipSelector {
    model: Arc<dyn GenerativeModel>,
    retry: RetryConfig,
}

impl ClipSelector {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &WorkerConfig) -> Self {
        Self {
            model,
            retry: RetryConfig::new("clip_selection")
                .with_max_attempts(config.selection_max_attempts)
                .with_attempt_timeout(config.selection_timeout),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Word-index selection over the uploaded video and its transcript.
    pub async fn select_from_video(&self, input: &VideoSelection<'_>) -> WorkerResult<Vec<SelectedClip>> {
        let word_count = input.transcript.word_count();
        if word_count < MIN_CLIP_WORDS {
            return Err(WorkerError::validation(format!(
                "transcript has {} words; a clip needs at least {}",
                word_count, MIN_CLIP_WORDS
            )));
        }

        let prompt = ModelPrompt {
            media: Some(input.media.clone()),
            text: input.prompt_text(),
            schema: response_schema::<WordIndexResponse>(),
        };

        self.run("word_index", &prompt, |value| {
            let parsed: WordIndexResponse = serde_json::from_value(value)
                .map_err(|e| WorkerError::validation(format!("malformed model output: {}", e)))?;
            validate_word_clips(&parsed.clips, word_count)
        })
        .await
    }

    /// Timestamp selection from text, used by re-analysis.
    pub async fn select_from_text(&self, input: &TextSelection<'_>) -> WorkerResult<Vec<SelectedClip>> {
        let duration = input.duration;
        let prompt = ModelPrompt {
            media: None,
            text: input.prompt_text(),
            schema: response_schema::<TimestampResponse>(),
        };

        self.run("timestamp", &prompt, |value| {
            let parsed: TimestampResponse = serde_json::from_value(value)
                .map_err(|e| WorkerError::validation(format!("malformed model output: {}", e)))?;
            validate_timestamp_clips(&parsed.clips, duration)
        })
        .await
    }

    async fn run<V>(&self, variant: &'static str, prompt: &ModelPrompt, validate: V) -> WorkerResult<Vec<SelectedClip>>
    where
        V: Fn(serde_json::Value) -> WorkerResult<Vec<SelectedClip>>,
    {
        let result = retry_bounded(&self.retry, WorkerError::is_selection_retryable, |attempt| {
            let validate = &validate;
            async move {
                metrics::counter!("reelcut_selection_attempts_total", "variant" => variant).increment(1);
                let value = self.model.generate_json(prompt).await?;
                validate(value).inspect_err(|e| {
                    metrics::counter!("reelcut_selection_validation_failures_total", "variant" => variant)
                        .increment(1);
                    warn!(variant, attempt, "Rejected model selection: {}", e);
                })
            }
        })
        .await;

        if let Ok(clips) = &result {
            info!(variant, clips = clips.len(), "Clip selection accepted");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reelcut_ai::{AiError, AiResult};
    use reelcut_models::Word;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers generate calls from a queue and counts them.
    struct ScriptedModel {
        answers: Mutex<Vec<serde_json::Value>>,
        calls: Mutex<u32>,
    }

    impl ScriptedModel {
        fn new(answers: Vec<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn upload_media(&self, _path: &Path, _mime: &str) -> AiResult<MediaRef> {
            unreachable!("selection tests never upload")
        }

        async fn delete_media(&self, _media: &MediaRef) -> AiResult<()> {
            Ok(())
        }

        async fn generate_json(&self, _prompt: &ModelPrompt) -> AiResult<serde_json::Value> {
            *self.calls.lock().unwrap() += 1;
            self.answers
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AiError::invalid_response("gemini", "no scripted answer left"))
        }
    }

    fn transcript(words: usize) -> Transcript {
        Transcript {
            text: String::new(),
            words: (0..words)
                .map(|i| Word::new(format!("w{}", i), i as f64 * 0.36, i as f64 * 0.36 + 0.3))
                .collect(),
        }
    }

    fn media() -> MediaRef {
        MediaRef {
            name: "files/v".to_string(),
            uri: "https://files/v".to_string(),
            mime_type: "video/mp4".to_string(),
        }
    }

    fn word_clip(start: i64, end: i64, rank: i64, score: f64) -> serde_json::Value {
        json!({
            "start_word_index": start, "end_word_index": end,
            "title": format!("Clip at {}", start), "hook": "hook",
            "hook_score": score, "strategic_rank": rank, "rationale": "because"
        })
    }

    fn selector(model: Arc<ScriptedModel>) -> ClipSelector {
        ClipSelector::new(model, &WorkerConfig::default()).with_retry(
            RetryConfig::new("clip_selection")
                .with_max_attempts(2)
                .with_base_delay(Duration::ZERO)
                .with_attempt_timeout(Duration::from_secs(5)),
        )
    }

    fn candidate(start: i64, end: i64) -> WordIndexCandidate {
        WordIndexCandidate {
            start_word_index: start,
            end_word_index: end,
            title: "t".to_string(),
            hook: "h".to_string(),
            hook_score: 5.0,
            strategic_rank: 1,
            rationale: "r".to_string(),
        }
    }

    #[test]
    fn test_target_clip_count() {
        assert_eq!(target_clip_count(12.0 * 60.0), 4);
        assert_eq!(target_clip_count(60.0), 3);
        assert_eq!(target_clip_count(0.0), 3);
        assert_eq!(target_clip_count(f64::NAN), 3);
        assert_eq!(target_clip_count(30.0 * 60.0), 10);
        assert_eq!(target_clip_count(4.0 * 3600.0), 15);
    }

    #[test]
    fn test_word_validation_rules() {
        assert!(validate_word_clips(&[candidate(120, 90)], 2000).is_err());
        assert!(validate_word_clips(&[candidate(-1, 100)], 2000).is_err());
        assert!(validate_word_clips(&[candidate(1900, 2000)], 2000).is_err());
        assert!(validate_word_clips(&[candidate(0, 78)], 2000).is_err());
        assert!(validate_word_clips(&[candidate(0, 79)], 2000).is_ok());
        assert!(validate_word_clips(&[candidate(0, 100), candidate(100, 200)], 2000).is_err());
        assert!(validate_word_clips(&[candidate(0, 100), candidate(101, 200)], 2000).is_ok());
        assert!(validate_word_clips(&[], 2000).is_err());
    }

    #[test]
    fn test_timestamp_validation_rules() {
        let clip = |start: f64, end: f64| TimestampCandidate {
            start_time_seconds: start,
            end_time_seconds: end,
            title: "t".to_string(),
            hook: "h".to_string(),
            hook_score: 5.0,
            strategic_rank: 1,
            rationale: "r".to_string(),
        };
        assert!(validate_timestamp_clips(&[clip(30.0, 20.0)], 600.0).is_err());
        assert!(validate_timestamp_clips(&[clip(590.0, 601.0)], 600.0).is_err());
        assert!(validate_timestamp_clips(&[clip(0.0, 9.5)], 600.0).is_err());
        assert!(validate_timestamp_clips(&[clip(f64::NAN, 20.0)], 600.0).is_err());
        assert!(validate_timestamp_clips(&[clip(0.0, 20.0), clip(20.0, 40.0)], 600.0).is_ok());
        assert!(validate_timestamp_clips(&[clip(0.0, 20.0), clip(19.0, 40.0)], 600.0).is_err());
    }

    #[test]
    fn test_accepted_clips_never_overlap_and_rank_densely() {
        let raw = vec![
            WordIndexCandidate { strategic_rank: 7, hook_score: 9.0, ..candidate(1000, 1100) },
            WordIndexCandidate { strategic_rank: 2, hook_score: 6.0, ..candidate(0, 90) },
            WordIndexCandidate { strategic_rank: 7, hook_score: 9.5, ..candidate(500, 600) },
        ];
        let clips = validate_word_clips(&raw, 2000).unwrap();

        let ranks: Vec<u32> = clips.iter().map(|c| c.strategic_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(clips[0].boundary, ClipBoundary::WordIndex { start: 0, end: 90 });
        assert_eq!(clips[1].boundary, ClipBoundary::WordIndex { start: 500, end: 600 });

        let mut by_start: Vec<_> = clips.iter().map(|c| c.boundary).collect();
        by_start.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
        for pair in by_start.windows(2) {
            if let (ClipBoundary::WordIndex { end, .. }, ClipBoundary::WordIndex { start, .. }) = (pair[0], pair[1]) {
                assert!(end < start);
            }
        }
    }

    #[tokio::test]
    async fn test_inverted_first_answer_is_retried() {
        let model = ScriptedModel::new(vec![
            json!({"clips": [word_clip(120, 90, 1, 8.0)]}),
            json!({"clips": [word_clip(100, 299, 1, 8.0), word_clip(500, 699, 2, 7.0)]}),
        ]);
        let transcript = transcript(2000);
        let media = media();
        let input = VideoSelection {
            media: &media,
            transcript: &transcript,
            duration: 720.0,
            script: None,
            guidance: None,
            target_count: 4,
        };

        let clips = selector(model.clone()).select_from_video(&input).await.unwrap();
        assert_eq!(clips.len(), 2);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_two_invalid_answers_fail_after_two_calls() {
        let model = ScriptedModel::new(vec![
            json!({"clips": [word_clip(120, 90, 1, 8.0)]}),
            json!({"clips": "not a list"}),
            json!({"clips": [word_clip(100, 299, 1, 8.0)]}),
        ]);
        let transcript = transcript(2000);
        let media = media();
        let input = VideoSelection {
            media: &media,
            transcript: &transcript,
            duration: 720.0,
            script: None,
            guidance: None,
            target_count: 4,
        };

        let err = selector(model.clone()).select_from_video(&input).await.unwrap_err();
        assert!(matches!(err, WorkerError::Validation(_)));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_short_transcript_fails_without_model_call() {
        let model = ScriptedModel::new(vec![]);
        let transcript = transcript(40);
        let media = media();
        let input = VideoSelection {
            media: &media,
            transcript: &transcript,
            duration: 30.0,
            script: None,
            guidance: None,
            target_count: 3,
        };

        assert!(selector(model.clone()).select_from_video(&input).await.is_err());
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_prompts_carry_context() {
        let transcript = transcript(3);
        let media = media();
        let guidance = json!({"tone": "energetic"});
        let video = VideoSelection {
            media: &media,
            transcript: &transcript,
            duration: 720.0,
            script: Some("Intro line"),
            guidance: Some(&guidance),
            target_count: 4,
        }
        .prompt_text();
        assert!(video.contains("Select exactly 4 clips"));
        assert!(video.contains("[2] w2"));
        assert!(video.contains("Intro line"));
        assert!(video.contains("energetic"));

        let text = TextSelection {
            transcript: "full text",
            duration: 600.0,
            shot_timestamps: &[12.5, 40.0],
            existing: &[],
            feedback: "shorter please",
            guidance: None,
            target_count: 3,
        }
        .prompt_text();
        assert!(text.contains("12.50, 40.00"));
        assert!(text.contains("shorter please"));
        assert!(text.contains("full text"));
    }
}
