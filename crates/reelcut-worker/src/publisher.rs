//! Uploading cut clips and swapping them in as the video's clip set.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{info, warn};

use reelcut_models::paths::{clip_object_path, mixed_video_path, sound_object_path, SlugAllocator, SoundObject};
use reelcut_models::{Clip, ClipId, Video};
use reelcut_storage::{ObjectStore, UploadOptions};

use crate::context::JobContext;
use crate::cutter::CutClip;
use crate::error::WorkerResult;
use crate::logging::JobLogger;

fn slug_of(storage_path: &str) -> Option<&str> {
    storage_path
        .rsplit('/')
        .next()
        .and_then(|name| name.strip_suffix(".mp4"))
        .filter(|slug| !slug.is_empty())
}

/// Every object a clip owns in the processed bucket.
pub fn clip_object_keys(clip: &Clip) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(path) = &clip.storage_path {
        keys.push(path.clone());
    }
    for item in &clip.sfx {
        keys.push(sound_object_path(&clip.id, SoundObject::Sfx(&item.id)));
    }
    if clip.background_music.is_some() {
        keys.push(sound_object_path(&clip.id, SoundObject::Music));
    }
    if clip.mixed_video_url.is_some() {
        keys.push(mixed_video_path(&clip.id));
    }
    keys
}

/// Delete objects, logging failures instead of returning them.
pub async fn delete_objects_best_effort(objects: &dyn ObjectStore, keys: impl IntoIterator<Item = String>) {
    let bucket = objects.processed_bucket();
    for key in keys {
        if let Err(e) = objects.delete(&bucket, &key).await {
            warn!(bucket = %bucket, key = %key, "Failed to delete stale object: {}", e);
        }
    }
}

/// Upload the cut clips and atomically replace the video's clip set with them.
///
/// New objects never overwrite keys that live clips still point at. If the
/// replacement fails the fresh uploads are removed again and the previous
/// set stays as it was; once it commits, the replaced clips' media is
/// deleted best-effort.
pub async fn publish_clip_set(
    ctx: &JobContext,
    video: &Video,
    mut cut: Vec<CutClip>,
    logger: &JobLogger,
) -> WorkerResult<Vec<Clip>> {
    let existing = ctx.store.list_clips(&video.id).await?;
    let mut slugs = SlugAllocator::new();
    for clip in &existing {
        if let Some(slug) = clip.storage_path.as_deref().and_then(slug_of) {
            slugs.reserve(slug);
        }
    }

    cut.sort_by_key(|c| c.planned.selected.strategic_rank);
    let bucket = ctx.objects.processed_bucket();
    let options = UploadOptions::video_mp4();
    let created_at = Utc::now();

    let mut clips = Vec::with_capacity(cut.len());
    let mut uploaded: Vec<String> = Vec::with_capacity(cut.len());
    for item in cut {
        let selected = item.planned.selected;
        let slug = slugs.allocate(&selected.title, selected.strategic_rank);
        let key = clip_object_path(&video.project_id, video.id.as_str(), &slug);

        if let Err(e) = ctx.objects.upload(&item.file, &bucket, &key, &options).await {
            delete_objects_best_effort(ctx.objects.as_ref(), uploaded).await;
            return Err(e.into());
        }
        uploaded.push(key.clone());

        clips.push(Clip {
            id: ClipId::new(),
            video_id: video.id.clone(),
            public_url: Some(ctx.objects.public_url(&key)),
            storage_path: Some(key),
            span: item.planned.span,
            strategic_rank: selected.strategic_rank,
            hook_score: selected.hook_score,
            rationale: selected.rationale,
            title: selected.title,
            hook: selected.hook,
            approved: None,
            sfx: Vec::new(),
            mixed_video_url: None,
            background_music: None,
            created_at,
        });
    }
    logger.log_stage("publishing", &format!("Uploaded {} clips", clips.len()));

    let previous = match ctx.store.replace_clips(&video.id, &clips).await {
        Ok(previous) => previous,
        Err(e) => {
            logger.log_warning(&format!("Clip set replacement failed, removing new uploads: {}", e));
            delete_objects_best_effort(ctx.objects.as_ref(), uploaded).await;
            return Err(e.into());
        }
    };

    let live: HashSet<&str> = clips.iter().filter_map(|c| c.storage_path.as_deref()).collect();
    let stale: Vec<String> = previous
        .iter()
        .flat_map(clip_object_keys)
        .filter(|key| !live.contains(key.as_str()))
        .collect();
    if !stale.is_empty() {
        info!(video_id = %video.id, count = stale.len(), "Deleting media of replaced clips");
        delete_objects_best_effort(ctx.objects.as_ref(), stale).await;
    }

    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::{BackgroundMusic, ClipSpan, SfxId, SfxItem, VideoId};

    #[test]
    fn test_slug_of() {
        assert_eq!(slug_of("p1/v1/big-reveal.mp4"), Some("big-reveal"));
        assert_eq!(slug_of("p1/v1/.mp4"), None);
        assert_eq!(slug_of("p1/v1/clip.mov"), None);
    }

    #[test]
    fn test_clip_object_keys_cover_sound_media() {
        let clip = Clip {
            id: ClipId::from("c1"),
            video_id: VideoId::from("v1"),
            storage_path: Some("p1/v1/hook.mp4".to_string()),
            public_url: Some("https://cdn/p1/v1/hook.mp4".to_string()),
            span: ClipSpan::new(0.0, 30.0).unwrap(),
            strategic_rank: 1,
            hook_score: 7.0,
            rationale: String::new(),
            title: "Hook".to_string(),
            hook: String::new(),
            approved: None,
            sfx: vec![SfxItem {
                id: SfxId::from("s1"),
                timestamp: 1.0,
                label: "whoosh".to_string(),
                prompt: "whoosh".to_string(),
                audio_url: "https://cdn/sounds/c1/sfx-s1.mp3".to_string(),
                duration: 1.0,
                volume: None,
            }],
            mixed_video_url: Some("https://cdn/sfx-videos/c1/output.mp4".to_string()),
            background_music: Some(BackgroundMusic {
                prompt: "lofi".to_string(),
                audio_url: "https://cdn/sounds/c1/music.mp3".to_string(),
                duration: 30.0,
                volume: Some(0.3),
            }),
            created_at: Utc::now(),
        };

        assert_eq!(
            clip_object_keys(&clip),
            vec![
                "p1/v1/hook.mp4",
                "sounds/c1/sfx-s1.mp3",
                "sounds/c1/music.mp3",
                "sfx-videos/c1/output.mp4",
            ]
        );
    }
}
