//! In-process [`VideoStore`] with the same transition and transaction rules
//! as the Firestore store. Used by tests and local dry runs.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use reelcut_models::{Clip, ClipId, ClipSoundUpdate, Video, VideoId, VideoStatus};

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{check_transition, sort_clips, VideoStore};

#[derive(Default)]
struct State {
    videos: HashMap<VideoId, Video>,
    clips: HashMap<ClipId, Clip>,
    status_history: HashMap<VideoId, Vec<VideoStatus>>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_next_replace_insert: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the insert phase of the next `replace_clips` fail after the old
    /// clips have been deleted.
    pub fn fail_next_replace_insert(&self) {
        self.fail_next_replace_insert.store(true, Ordering::SeqCst);
    }

    /// Every status the video has been moved to, in order.
    pub fn status_history(&self, id: &VideoId) -> Vec<VideoStatus> {
        self.state()
            .status_history
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clip_count(&self) -> usize {
        self.state().clips.len()
    }
}

fn missing_video(id: &VideoId) -> FirestoreError {
    FirestoreError::not_found(format!("videos/{}", id))
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<Video>> {
        Ok(self.state().videos.get(id).cloned())
    }

    async fn create_video(&self, video: &Video) -> FirestoreResult<()> {
        let mut state = self.state();
        if state.videos.contains_key(&video.id) {
            return Err(FirestoreError::AlreadyExists(format!("videos/{}", video.id)));
        }
        state.videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: &VideoId,
        status: VideoStatus,
        error_message: Option<String>,
    ) -> FirestoreResult<()> {
        let mut state = self.state();
        let video = state.videos.get_mut(id).ok_or_else(|| missing_video(id))?;
        check_transition(video.status, status)?;
        video.status = status;
        video.error_message = if status == VideoStatus::Failed {
            error_message
        } else {
            None
        };
        video.updated_at = Utc::now();
        state.status_history.entry(id.clone()).or_default().push(status);
        Ok(())
    }

    async fn set_duration_once(&self, id: &VideoId, duration: f64) -> FirestoreResult<f64> {
        let mut state = self.state();
        let video = state.videos.get_mut(id).ok_or_else(|| missing_video(id))?;
        Ok(*video.duration_seconds.get_or_insert(duration))
    }

    async fn set_transcript(&self, id: &VideoId, transcript: &str) -> FirestoreResult<()> {
        let mut state = self.state();
        let video = state.videos.get_mut(id).ok_or_else(|| missing_video(id))?;
        video.transcript = Some(transcript.to_string());
        Ok(())
    }

    async fn set_shot_timestamps(&self, id: &VideoId, shots: &[f64]) -> FirestoreResult<()> {
        let mut state = self.state();
        let video = state.videos.get_mut(id).ok_or_else(|| missing_video(id))?;
        video.shot_timestamps = Some(shots.to_vec());
        Ok(())
    }

    async fn list_clips(&self, video_id: &VideoId) -> FirestoreResult<Vec<Clip>> {
        let mut clips: Vec<Clip> = self
            .state()
            .clips
            .values()
            .filter(|c| &c.video_id == video_id)
            .cloned()
            .collect();
        sort_clips(&mut clips);
        Ok(clips)
    }

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>> {
        Ok(self.state().clips.get(clip_id).cloned())
    }

    async fn insert_clips(&self, clips: &[Clip]) -> FirestoreResult<()> {
        let mut state = self.state();
        if let Some(dup) = clips.iter().find(|c| state.clips.contains_key(&c.id)) {
            return Err(FirestoreError::AlreadyExists(format!("clips/{}", dup.id)));
        }
        for clip in clips {
            state.clips.insert(clip.id.clone(), clip.clone());
        }
        Ok(())
    }

    async fn replace_clips(&self, video_id: &VideoId, clips: &[Clip]) -> FirestoreResult<Vec<Clip>> {
        let mut state = self.state();
        let snapshot = state.clips.clone();

        let mut previous: Vec<Clip> = Vec::new();
        state.clips.retain(|_, clip| {
            if &clip.video_id == video_id {
                previous.push(clip.clone());
                false
            } else {
                true
            }
        });

        let insert_failed = self.fail_next_replace_insert.swap(false, Ordering::SeqCst)
            || clips.iter().any(|c| state.clips.contains_key(&c.id));
        if insert_failed {
            state.clips = snapshot;
            return Err(FirestoreError::transaction_failed(format!(
                "insert of {} clips for video {} failed",
                clips.len(),
                video_id
            )));
        }

        for clip in clips {
            state.clips.insert(clip.id.clone(), clip.clone());
        }
        sort_clips(&mut previous);
        Ok(previous)
    }

    async fn update_clip_sound(&self, clip_id: &ClipId, update: &ClipSoundUpdate) -> FirestoreResult<()> {
        let mut state = self.state();
        let clip = state
            .clips
            .get_mut(clip_id)
            .ok_or_else(|| FirestoreError::not_found(format!("clips/{}", clip_id)))?;
        clip.sfx = update.sfx.clone();
        clip.mixed_video_url = update.mixed_video_url.clone();
        clip.background_music = update.background_music.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::ClipSpan;

    fn clip(id: &str, rank: u32) -> Clip {
        Clip {
            id: ClipId::from(id),
            video_id: VideoId::from("v1"),
            storage_path: Some(format!("p1/v1/{}.mp4", id)),
            public_url: None,
            span: ClipSpan::new(rank as f64 * 60.0, rank as f64 * 60.0 + 30.0).unwrap(),
            strategic_rank: rank,
            hook_score: 7.0,
            rationale: "r".to_string(),
            title: id.to_string(),
            hook: "h".to_string(),
            approved: None,
            sfx: Vec::new(),
            mixed_video_url: None,
            background_music: None,
            created_at: Utc::now(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut video = Video::pending("p1", "talk.mp4", "p1/talk.mp4");
        video.id = VideoId::from("v1");
        store.create_video(&video).await.unwrap();
        store
            .insert_clips(&(1..=5).map(|r| clip(&format!("c{}", r), r)).collect::<Vec<_>>())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_failed_insert_keeps_original_clip_set() {
        let store = seeded().await;
        let id = VideoId::from("v1");
        let before = store.list_clips(&id).await.unwrap();

        store.fail_next_replace_insert();
        let err = store.replace_clips(&id, &[clip("n1", 1)]).await.unwrap_err();
        assert!(matches!(err, FirestoreError::TransactionFailed(_)));

        let after = store.list_clips(&id).await.unwrap();
        assert_eq!(after.len(), 5);
        let ids = |clips: &[Clip]| clips.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&after), ids(&before));
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let store = seeded().await;
        let id = VideoId::from("v1");
        let previous = store
            .replace_clips(&id, &[clip("n1", 1), clip("n2", 2)])
            .await
            .unwrap();
        assert_eq!(previous.len(), 5);
        assert_eq!(store.list_clips(&id).await.unwrap().len(), 2);
        assert_eq!(store.clip_count(), 2);
    }

    #[tokio::test]
    async fn test_duration_is_set_once() {
        let store = seeded().await;
        let id = VideoId::from("v1");
        assert_eq!(store.set_duration_once(&id, 720.0).await.unwrap(), 720.0);
        assert_eq!(store.set_duration_once(&id, 10.0).await.unwrap(), 720.0);
    }

    #[tokio::test]
    async fn test_status_machine_enforced() {
        let store = seeded().await;
        let id = VideoId::from("v1");
        store.update_status(&id, VideoStatus::Processing, None).await.unwrap();
        store
            .update_status(&id, VideoStatus::Failed, Some("boom".to_string()))
            .await
            .unwrap();
        assert_eq!(
            store.get_video(&id).await.unwrap().unwrap().error_message.as_deref(),
            Some("boom")
        );
        assert!(store.update_status(&id, VideoStatus::Completed, None).await.is_err());

        store.update_status(&id, VideoStatus::Processing, None).await.unwrap();
        assert_eq!(store.get_video(&id).await.unwrap().unwrap().error_message, None);
        assert_eq!(
            store.status_history(&id),
            vec![VideoStatus::Processing, VideoStatus::Failed, VideoStatus::Processing]
        );
    }
}
