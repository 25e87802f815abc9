//! Video and clip persistence.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};

use reelcut_models::{Clip, ClipId, ClipSoundUpdate, Video, VideoId, VideoStatus};

use crate::client::{FirestoreClient, MAX_WRITES_PER_COMMIT};
use crate::codec::{from_document, masked_fields, to_fields, CLIPS, VIDEOS};
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_transaction;
use crate::types::{Document, StructuredQuery, ToFirestoreValue, Value, Write};

/// Store operations the pipeline needs.
///
/// Each stage writes only its own fields. `replace_clips` is the one
/// multi-document operation and is atomic.
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<Video>>;

    async fn create_video(&self, video: &Video) -> FirestoreResult<()>;

    /// Move to `status`, rejecting transitions the state machine forbids.
    /// `error_message` is stored with `Failed` and cleared otherwise.
    async fn update_status(
        &self,
        id: &VideoId,
        status: VideoStatus,
        error_message: Option<String>,
    ) -> FirestoreResult<()>;

    /// Record the duration unless one is already stored; returns the stored value.
    async fn set_duration_once(&self, id: &VideoId, duration: f64) -> FirestoreResult<f64>;

    async fn set_transcript(&self, id: &VideoId, transcript: &str) -> FirestoreResult<()>;

    async fn set_shot_timestamps(&self, id: &VideoId, shots: &[f64]) -> FirestoreResult<()>;

    /// Clips of a video ordered by strategic rank.
    async fn list_clips(&self, video_id: &VideoId) -> FirestoreResult<Vec<Clip>>;

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>>;

    async fn insert_clips(&self, clips: &[Clip]) -> FirestoreResult<()>;

    /// Atomically swap the clip set of a video; returns the replaced clips.
    /// On failure the previous set is left untouched.
    async fn replace_clips(&self, video_id: &VideoId, clips: &[Clip]) -> FirestoreResult<Vec<Clip>>;

    async fn update_clip_sound(&self, clip_id: &ClipId, update: &ClipSoundUpdate) -> FirestoreResult<()>;
}

pub(crate) fn sort_clips(clips: &mut [Clip]) {
    clips.sort_by(|a, b| {
        a.strategic_rank
            .cmp(&b.strategic_rank)
            .then(a.start_time().total_cmp(&b.start_time()))
    });
}

pub(crate) fn check_transition(from: VideoStatus, to: VideoStatus) -> FirestoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(FirestoreError::InvalidTransition { from, to })
    }
}

/// Firestore-backed store: top-level `videos` and `clips` collections,
/// clips linked by their `video_id` field.
#[derive(Clone)]
pub struct FirestoreStore {
    client: FirestoreClient,
}

impl FirestoreStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    async fn video_document(&self, id: &VideoId) -> FirestoreResult<(Video, Document)> {
        let doc = self
            .client
            .with_retry("get_video", || self.client.get_document(VIDEOS, id.as_str()))
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", VIDEOS, id)))?;
        Ok((from_document(&doc)?, doc))
    }

    fn update_time(doc: &Document) -> FirestoreResult<&str> {
        doc.update_time
            .as_deref()
            .ok_or_else(|| FirestoreError::InvalidResponse("document has no updateTime".to_string()))
    }

    async fn patch_video(
        &self,
        id: &VideoId,
        mut fields: HashMap<String, Value>,
        mut mask: Vec<String>,
    ) -> FirestoreResult<()> {
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        mask.push("updated_at".to_string());
        self.client
            .with_retry("update_video", || {
                self.client
                    .update_document(VIDEOS, id.as_str(), fields.clone(), Some(mask.clone()))
            })
            .await?;
        Ok(())
    }

    fn clip_query(video_id: &VideoId) -> StructuredQuery {
        StructuredQuery::field_equals(CLIPS, "video_id", video_id.as_str().to_firestore_value())
    }

    fn decode_clips(docs: &[Document]) -> FirestoreResult<Vec<Clip>> {
        let mut clips = docs.iter().map(from_document).collect::<FirestoreResult<Vec<Clip>>>()?;
        sort_clips(&mut clips);
        Ok(clips)
    }

    fn insert_write(&self, clip: &Clip) -> FirestoreResult<Write> {
        let name = self.client.document_name(CLIPS, clip.id.as_str());
        Ok(Write::insert(Document::named(name, to_fields(clip)?)))
    }

    async fn replace_in_transaction(
        &self,
        transaction: &str,
        video_id: &VideoId,
        clips: &[Clip],
    ) -> FirestoreResult<Vec<Clip>> {
        let old_docs = self
            .client
            .run_query(Self::clip_query(video_id), Some(transaction))
            .await?;
        let previous = Self::decode_clips(&old_docs)?;

        let mut writes: Vec<Write> = old_docs
            .iter()
            .filter_map(|doc| doc.name.clone())
            .map(Write::delete)
            .collect();
        for clip in clips {
            writes.push(self.insert_write(clip)?);
        }

        self.client
            .commit(writes, Some(transaction.to_string()))
            .await?;
        Ok(previous)
    }
}

#[async_trait]
impl VideoStore for FirestoreStore {
    async fn get_video(&self, id: &VideoId) -> FirestoreResult<Option<Video>> {
        let doc = self
            .client
            .with_retry("get_video", || self.client.get_document(VIDEOS, id.as_str()))
            .await?;
        doc.as_ref().map(from_document).transpose()
    }

    async fn create_video(&self, video: &Video) -> FirestoreResult<()> {
        self.client
            .create_document(VIDEOS, video.id.as_str(), to_fields(video)?)
            .await?;
        info!(video_id = %video.id, "Created video record");
        Ok(())
    }

    async fn update_status(
        &self,
        id: &VideoId,
        status: VideoStatus,
        error_message: Option<String>,
    ) -> FirestoreResult<()> {
        let (video, doc) = self.video_document(id).await?;
        check_transition(video.status, status)?;

        let mut fields = HashMap::new();
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
        if status == VideoStatus::Failed {
            if let Some(message) = error_message {
                fields.insert("error_message".to_string(), message.to_firestore_value());
            }
        }
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        let mask = vec![
            "status".to_string(),
            "error_message".to_string(),
            "updated_at".to_string(),
        ];

        // Guard against a concurrent writer moving the status underneath us
        self.client
            .update_document_with_precondition(
                VIDEOS,
                id.as_str(),
                fields,
                Some(mask),
                Self::update_time(&doc)?,
            )
            .await?;
        info!(video_id = %id, from = %video.status, to = %status, "Video status updated");
        Ok(())
    }

    async fn set_duration_once(&self, id: &VideoId, duration: f64) -> FirestoreResult<f64> {
        let (video, doc) = self.video_document(id).await?;
        if let Some(existing) = video.duration_seconds {
            if (existing - duration).abs() > 1e-3 {
                warn!(video_id = %id, existing, probed = duration, "Keeping previously recorded duration");
            }
            return Ok(existing);
        }

        let mut fields = HashMap::new();
        fields.insert("duration_seconds".to_string(), duration.to_firestore_value());
        fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());
        self.client
            .update_document_with_precondition(
                VIDEOS,
                id.as_str(),
                fields,
                Some(vec!["duration_seconds".to_string(), "updated_at".to_string()]),
                Self::update_time(&doc)?,
            )
            .await?;
        Ok(duration)
    }

    async fn set_transcript(&self, id: &VideoId, transcript: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("transcript".to_string(), transcript.to_firestore_value());
        self.patch_video(id, fields, vec!["transcript".to_string()]).await
    }

    async fn set_shot_timestamps(&self, id: &VideoId, shots: &[f64]) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert("shot_timestamps".to_string(), shots.to_vec().to_firestore_value());
        self.patch_video(id, fields, vec!["shot_timestamps".to_string()]).await
    }

    async fn list_clips(&self, video_id: &VideoId) -> FirestoreResult<Vec<Clip>> {
        let docs = self
            .client
            .with_retry("list_clips", || self.client.run_query(Self::clip_query(video_id), None))
            .await?;
        Self::decode_clips(&docs)
    }

    async fn get_clip(&self, clip_id: &ClipId) -> FirestoreResult<Option<Clip>> {
        let doc = self
            .client
            .with_retry("get_clip", || self.client.get_document(CLIPS, clip_id.as_str()))
            .await?;
        doc.as_ref().map(from_document).transpose()
    }

    async fn insert_clips(&self, clips: &[Clip]) -> FirestoreResult<()> {
        for chunk in clips.chunks(MAX_WRITES_PER_COMMIT) {
            let writes = chunk
                .iter()
                .map(|clip| self.insert_write(clip))
                .collect::<FirestoreResult<Vec<_>>>()?;
            self.client.commit(writes, None).await?;
        }
        info!(count = clips.len(), "Inserted clips");
        Ok(())
    }

    async fn replace_clips(&self, video_id: &VideoId, clips: &[Clip]) -> FirestoreResult<Vec<Clip>> {
        let transaction = self.client.begin_transaction().await?;

        match self.replace_in_transaction(&transaction, video_id, clips).await {
            Ok(previous) => {
                record_transaction("committed");
                info!(
                    video_id = %video_id,
                    removed = previous.len(),
                    inserted = clips.len(),
                    "Replaced clip set"
                );
                Ok(previous)
            }
            Err(e) => {
                record_transaction("rolled_back");
                if let Err(rollback_err) = self.client.rollback(transaction).await {
                    warn!(video_id = %video_id, "Rollback after failed replace also failed: {}", rollback_err);
                }
                Err(match e {
                    FirestoreError::TransactionFailed(_) => e,
                    other => FirestoreError::transaction_failed(other.to_string()),
                })
            }
        }
    }

    async fn update_clip_sound(&self, clip_id: &ClipId, update: &ClipSoundUpdate) -> FirestoreResult<()> {
        let (fields, mask) =
            masked_fields(update, &["sfx", "mixed_video_url", "background_music"])?;
        self.client
            .with_retry("update_clip_sound", || {
                self.client
                    .update_document(CLIPS, clip_id.as_str(), fields.clone(), Some(mask.clone()))
            })
            .await?;
        Ok(())
    }
}
