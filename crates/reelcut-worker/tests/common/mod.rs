//! In-process fakes for end-to-end job tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use reelcut_ai::{AiError, AiResult, AudioGenerator, GenerativeModel, MediaRef, ModelPrompt, ShotDetector, Transcriber};
use reelcut_firestore::{MemoryStore, VideoStore};
use reelcut_media::{MediaError, MediaInfo, MediaResult, MediaToolkit, SoundLayer};
use reelcut_models::{
    Clip, ClipId, ClipSpan, ShotBoundary, SilenceInterval, SoundKind, Transcript, Video, VideoStatus, Word,
};
use reelcut_storage::{IngestResolver, ListPage, ObjectInfo, ObjectStore, StorageError, StorageResult, UploadOptions};
use reelcut_worker::{JobContext, WorkerConfig};

pub const UPLOAD_BUCKET: &str = "uploads";
pub const PROCESSED_BUCKET: &str = "processed";

// ---------------------------------------------------------------------------
// Object store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeObjects {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub uploads: Mutex<Vec<(String, UploadOptions)>>,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeObjects {
    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn keys(&self, bucket: &str) -> HashSet<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FakeObjects {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.contains(bucket, key))
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()> {
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::not_found(format!("{}/{}", bucket, key)))?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, bytes)?;
        Ok(())
    }

    async fn upload(&self, src: &Path, bucket: &str, key: &str, options: &UploadOptions) -> StorageResult<()> {
        let bytes = std::fs::read(src)?;
        self.put(bucket, key, &bytes);
        self.uploads.lock().unwrap().push((key.to_string(), options.clone()));
        Ok(())
    }

    async fn list_page(&self, bucket: &str, prefix: &str, _token: Option<String>) -> StorageResult<ListPage> {
        let objects = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .map(|((_, k), v)| ObjectInfo {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect();
        Ok(ListPage {
            objects,
            next_token: None,
        })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://cdn.test/{}", key)
    }

    fn processed_bucket(&self) -> String {
        PROCESSED_BUCKET.to_string()
    }
}

// ---------------------------------------------------------------------------
// Media toolkit
// ---------------------------------------------------------------------------

pub struct FakeMedia {
    pub duration: f64,
    pub silences: Vec<SilenceInterval>,
    /// 1-based cut calls that fail
    pub failing_cuts: HashSet<u32>,
    pub fail_mix: bool,
    pub cut_calls: AtomicU32,
    pub cuts: Mutex<Vec<(f64, f64)>>,
    pub mixes: Mutex<Vec<Vec<SoundLayer>>>,
}

impl FakeMedia {
    pub fn new(duration: f64, silences: Vec<SilenceInterval>) -> Self {
        Self {
            duration,
            silences,
            failing_cuts: HashSet::new(),
            fail_mix: false,
            cut_calls: AtomicU32::new(0),
            cuts: Mutex::new(Vec::new()),
            mixes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaToolkit for FakeMedia {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        Ok(MediaInfo {
            duration: self.duration,
            has_video: true,
            has_audio: true,
            width: Some(1920),
            height: Some(1080),
        })
    }

    async fn detect_silence(&self, _path: &Path, _duration: Option<f64>) -> MediaResult<Vec<SilenceInterval>> {
        Ok(self.silences.clone())
    }

    async fn extract_audio(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        std::fs::write(output, b"OggS")?;
        Ok(())
    }

    async fn cut_clip(&self, _input: &Path, output: &Path, start: f64, duration: f64) -> MediaResult<()> {
        let call = self.cut_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_cuts.contains(&call) {
            return Err(MediaError::tool_failed(
                "ffmpeg",
                "encoder exited",
                Some("Conversion failed!".to_string()),
                Some(1),
            ));
        }
        self.cuts.lock().unwrap().push((start, duration));
        std::fs::write(output, format!("clip {:.3}+{:.3}", start, duration))?;
        Ok(())
    }

    async fn mix(&self, _video_url: &str, layers: &[SoundLayer], output: &Path) -> MediaResult<()> {
        if self.fail_mix {
            return Err(MediaError::tool_failed("ffmpeg", "amix failed", None, Some(1)));
        }
        self.mixes.lock().unwrap().push(layers.to_vec());
        std::fs::write(output, b"mixed")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AI services
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeModel {
    answers: Mutex<Vec<serde_json::Value>>,
    pub generate_calls: AtomicU32,
    pub uploads: AtomicU32,
    pub deletes: AtomicU32,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    /// Answers are handed out in the given order.
    pub fn new(answers: Vec<serde_json::Value>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().rev().collect()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn upload_media(&self, path: &Path, mime_type: &str) -> AiResult<MediaRef> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(MediaRef {
            name: format!("files/{}", n),
            uri: format!("https://files.test/{}", path.display()),
            mime_type: mime_type.to_string(),
        })
    }

    async fn delete_media(&self, _media: &MediaRef) -> AiResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn generate_json(&self, prompt: &ModelPrompt) -> AiResult<serde_json::Value> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.text.clone());
        self.answers
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| AiError::invalid_response("gemini", "no answer queued"))
    }
}

pub struct FakeTranscriber(pub Transcript);

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &Path) -> AiResult<Transcript> {
        assert!(audio.exists(), "audio must be extracted before transcription");
        Ok(self.0.clone())
    }
}

pub struct FakeShots(pub Vec<ShotBoundary>);

#[async_trait]
impl ShotDetector for FakeShots {
    async fn detect_shots(&self, video_url: &str) -> AiResult<Vec<ShotBoundary>> {
        assert!(video_url.starts_with("s3://"));
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct FakeAudio {
    pub requests: Mutex<Vec<(String, SoundKind, f64)>>,
}

#[async_trait]
impl AudioGenerator for FakeAudio {
    async fn generate(&self, prompt: &str, kind: SoundKind, duration: f64) -> AiResult<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .push((prompt.to_string(), kind, duration));
        Ok(b"ID3audio".to_vec())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// `count` words spaced evenly over `duration` seconds.
pub fn transcript(count: usize, duration: f64) -> Transcript {
    let step = duration / count as f64;
    let words: Vec<Word> = (0..count)
        .map(|i| Word::new(format!("w{}", i), i as f64 * step, i as f64 * step + step * 0.8))
        .collect();
    let text = words.iter().map(|w| w.word.as_str()).collect::<Vec<_>>().join(" ");
    Transcript { text, words }
}

pub fn word_clip(start: i64, end: i64, rank: i64, score: f64, title: &str) -> serde_json::Value {
    json!({
        "start_word_index": start,
        "end_word_index": end,
        "title": title,
        "hook": format!("{} hook", title),
        "hook_score": score,
        "strategic_rank": rank,
        "rationale": "strong standalone moment"
    })
}

pub fn time_clip(start: f64, end: f64, rank: i64, title: &str) -> serde_json::Value {
    json!({
        "start_time_seconds": start,
        "end_time_seconds": end,
        "title": title,
        "hook": format!("{} hook", title),
        "hook_score": 7.5,
        "strategic_rank": rank,
        "rationale": "addresses the feedback"
    })
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub objects: Arc<FakeObjects>,
    pub media: Arc<FakeMedia>,
    pub model: Arc<FakeModel>,
    pub audio: Arc<FakeAudio>,
    pub ctx: JobContext,
    pub work: TempDir,
}

impl Harness {
    pub fn new(media: FakeMedia, model: FakeModel, transcript: Transcript) -> Self {
        let work = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(FakeObjects::default());
        let media = Arc::new(media);
        let model = Arc::new(model);
        let audio = Arc::new(FakeAudio::default());

        let config = WorkerConfig {
            work_dir: work.path().join("jobs").display().to_string(),
            selection_timeout: Duration::from_secs(10),
            ..WorkerConfig::default()
        };

        let ctx = JobContext {
            config,
            store: store.clone(),
            objects: objects.clone(),
            resolver: IngestResolver::new(objects.clone(), UPLOAD_BUCKET, None, 2),
            media: media.clone(),
            model: model.clone(),
            transcriber: Arc::new(FakeTranscriber(transcript)),
            shots: Arc::new(FakeShots(vec![
                ShotBoundary {
                    start_time: 0.0,
                    end_time: 95.0,
                },
                ShotBoundary {
                    start_time: 95.0,
                    end_time: 400.0,
                },
            ])),
            audio: Some(audio.clone()),
        };

        Self {
            store,
            objects,
            media,
            model,
            audio,
            ctx,
            work,
        }
    }

    /// Store a video and its uploaded bytes.
    pub async fn seed_video(&self, status: VideoStatus) -> Video {
        let mut video = Video::pending("proj1", "talk.mp4", "proj1/talk.mp4");
        video.status = status;
        self.objects.put(UPLOAD_BUCKET, "proj1/talk.mp4", b"source-bytes");
        self.store.create_video(&video).await.unwrap();
        video
    }

    /// Insert an already-published clip set.
    pub async fn seed_clips(&self, video: &Video, count: usize) -> Vec<Clip> {
        let clips: Vec<Clip> = (0..count)
            .map(|i| {
                let key = format!("proj1/{}/old-{}.mp4", video.id, i + 1);
                self.objects.put(PROCESSED_BUCKET, &key, b"old clip");
                Clip {
                    id: ClipId::new(),
                    video_id: video.id.clone(),
                    public_url: Some(format!("https://cdn.test/{}", key)),
                    storage_path: Some(key),
                    span: ClipSpan::new(i as f64 * 100.0, i as f64 * 100.0 + 40.0).unwrap(),
                    strategic_rank: i as u32 + 1,
                    hook_score: 6.0,
                    rationale: "original".to_string(),
                    title: format!("Old {}", i + 1),
                    hook: String::new(),
                    approved: None,
                    sfx: Vec::new(),
                    mixed_video_url: None,
                    background_music: None,
                    created_at: chrono::Utc::now(),
                }
            })
            .collect();
        self.store.insert_clips(&clips).await.unwrap();
        clips
    }

    /// Entries left behind in the work directory.
    pub fn leftover_scratch(&self) -> usize {
        std::fs::read_dir(self.work.path().join("jobs"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
