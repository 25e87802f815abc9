//! Sound effects and background music for one cut clip.
//!
//! Every operation works on a copy of the clip's sound fields, re-mixes, and
//! writes the fields back in a single store update at the very end. A failure
//! anywhere before that leaves the stored clip as it was.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use reelcut_ai::{response_schema, ModelPrompt};
use reelcut_media::{ScratchDir, SoundLayer};
use reelcut_models::paths::{mixed_video_path, sound_object_path, SoundObject};
use reelcut_models::{BackgroundMusic, Clip, ClipId, ClipSoundUpdate, SfxId, SfxItem, SoundAction, SoundKind};
use reelcut_storage::UploadOptions;

use crate::context::JobContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::publisher::delete_objects_best_effort;
use crate::retry::{retry_bounded, RetryConfig};

const MAX_LABEL_CHARS: usize = 80;

const MOMENTS_PROMPT: &str = r#"You are a sound designer for short-form social video. Watch the attached clip and pick the moments where a short sound effect would add punch: reveals, punchlines, transitions, emphasis, on-screen actions.

For each moment give:
- timestamp: seconds from the start of the clip
- label: two or three words naming the effect
- prompt: a vivid description of the sound for an audio generator, without mentioning music or speech
- duration: effect length in seconds, between 0.5 and 22

Keep effects sparse; never place two within one second of each other."#;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MomentsResponse {
    pub moments: Vec<Moment>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Moment {
    pub timestamp: f64,
    pub label: String,
    pub prompt: String,
    pub duration: f64,
}

/// Keep moments that land inside the clip, clamp their durations, and cap
/// the count. Earlier moments win.
pub fn usable_moments(mut moments: Vec<Moment>, clip_duration: f64, cap: usize) -> Vec<Moment> {
    moments.retain(|m| {
        m.timestamp.is_finite() && m.timestamp >= 0.0 && m.timestamp < clip_duration && !m.prompt.trim().is_empty()
    });
    moments.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    moments.truncate(cap);
    for m in &mut moments {
        m.duration = SoundKind::Effect.clamp_duration(m.duration);
        m.prompt = m.prompt.trim().to_string();
        let label = m.label.trim();
        let label = if label.is_empty() { m.prompt.as_str() } else { label };
        m.label = label.chars().take(MAX_LABEL_CHARS).collect();
    }
    moments
}

/// Mix layers for the clip's current sound fields, music first.
pub fn sound_layers(clip: &Clip) -> Vec<SoundLayer> {
    let mut layers = Vec::with_capacity(clip.sfx.len() + 1);
    if let Some(music) = &clip.background_music {
        layers.push(SoundLayer::new(music.audio_url.clone(), 0.0, music.volume.unwrap_or(1.0)));
    }
    for item in &clip.sfx {
        layers.push(SoundLayer::new(item.audio_url.clone(), item.timestamp, item.effective_volume()));
    }
    layers
}

fn invalid(e: validator::ValidationErrors) -> WorkerError {
    WorkerError::invalid_job(e.to_string())
}

fn check_item(item: &SfxItem, clip_duration: f64) -> WorkerResult<()> {
    item.validate().map_err(invalid)?;
    if !item.fits_clip(clip_duration) {
        return Err(WorkerError::invalid_job(format!(
            "sound effect at {:.2}s does not fit a {:.2}s clip",
            item.timestamp, clip_duration
        )));
    }
    Ok(())
}

/// Bookkeeping for objects touched by one operation.
#[derive(Default)]
struct Touched {
    /// Keys created by this run, removed again if the run fails
    created: Vec<String>,
    /// Keys to delete once the new state is stored
    obsolete: Vec<String>,
}

struct SoundRun<'a> {
    ctx: &'a JobContext,
    clip: Clip,
    scratch: ScratchDir,
    touched: Touched,
    logger: &'a JobLogger,
}

impl<'a> SoundRun<'a> {
    fn clip_duration(&self) -> f64 {
        self.clip.duration()
    }

    /// Generate audio, upload it to the clip's sound key and return its URL.
    async fn generate_audio(
        &mut self,
        object: SoundObject<'_>,
        prompt: &str,
        kind: SoundKind,
        duration: f64,
        overwrite: bool,
    ) -> WorkerResult<String> {
        let bytes = self.ctx.audio()?.generate(prompt, kind, duration).await?;

        let key = sound_object_path(&self.clip.id, object);
        let file = self.scratch.join(key.replace('/', "_"));
        tokio::fs::write(&file, &bytes).await?;

        let options = if overwrite {
            UploadOptions {
                cache_control: Some("no-cache".to_string()),
                ..UploadOptions::audio_mpeg()
            }
        } else {
            UploadOptions::audio_mpeg()
        };
        let bucket = self.ctx.objects.processed_bucket();
        self.ctx.objects.upload(&file, &bucket, &key, &options).await?;
        if !overwrite {
            self.touched.created.push(key.clone());
        }

        debug!(clip_id = %self.clip.id, key = %key, kind = kind.as_str(), bytes = bytes.len(), "Uploaded generated audio");
        Ok(self.ctx.objects.public_url(&key))
    }

    async fn add_effect(
        &mut self,
        prompt: &str,
        label: &str,
        timestamp: f64,
        duration: f64,
        volume: Option<f64>,
    ) -> WorkerResult<()> {
        let id = SfxId::new();
        let duration = SoundKind::Effect.clamp_duration(duration);
        let mut item = SfxItem {
            id: id.clone(),
            timestamp,
            label: label.trim().to_string(),
            prompt: prompt.trim().to_string(),
            audio_url: String::new(),
            duration,
            volume,
        };
        check_item(&item, self.clip_duration())?;

        item.audio_url = self
            .generate_audio(SoundObject::Sfx(&id), &item.prompt, SoundKind::Effect, duration, false)
            .await?;
        self.clip.sfx.push(item);
        Ok(())
    }

    async fn propose_moments(&mut self, max_items: Option<u32>) -> WorkerResult<Vec<Moment>> {
        let ctx = self.ctx;
        let config = &ctx.config;
        let cap = max_items.map_or(config.max_auto_sfx, |n| n.min(config.max_auto_sfx)) as usize;

        let storage_path = self
            .clip
            .storage_path
            .clone()
            .ok_or_else(|| WorkerError::invalid_job(format!("clip {} has not been cut", self.clip.id)))?;
        let local = self.scratch.join("clip.mp4");
        ctx.objects
            .download(&ctx.objects.processed_bucket(), &storage_path, &local)
            .await?;

        let media = ctx.model.upload_media(&local, "video/mp4").await?;
        let prompt = ModelPrompt {
            media: Some(media.clone()),
            text: format!(
                "{}\n\nThe clip is {:.2} seconds long. Propose at most {} moments.",
                MOMENTS_PROMPT,
                self.clip_duration(),
                cap
            ),
            schema: response_schema::<MomentsResponse>(),
        };

        let retry = RetryConfig::new("sfx_moments")
            .with_max_attempts(config.selection_max_attempts)
            .with_attempt_timeout(config.selection_timeout);
        let model = ctx.model.as_ref();
        let prompt = &prompt;
        let result = retry_bounded(&retry, WorkerError::is_selection_retryable, |_| async move {
            let value = model.generate_json(prompt).await?;
            serde_json::from_value::<MomentsResponse>(value)
                .map_err(|e| WorkerError::validation(format!("malformed moments: {}", e)))
        })
        .await;

        if let Err(e) = model.delete_media(&media).await {
            self.logger.log_warning(&format!("Failed to delete uploaded clip {}: {}", media.name, e));
        }

        let moments = usable_moments(result?.moments, self.clip_duration(), cap);
        if moments.is_empty() {
            return Err(WorkerError::validation("model proposed no moments inside the clip"));
        }
        Ok(moments)
    }

    async fn apply(&mut self, action: &SoundAction) -> WorkerResult<()> {
        match action {
            SoundAction::GenerateSfx { max_items } => {
                let moments = self.propose_moments(*max_items).await?;
                self.logger
                    .log_stage("sound", &format!("Generating {} sound effects", moments.len()));
                for m in moments {
                    self.add_effect(&m.prompt, &m.label, m.timestamp, m.duration, None).await?;
                }
            }

            SoundAction::AddSfx {
                prompt,
                label,
                timestamp,
                duration,
                volume,
            } => {
                self.add_effect(prompt, label, *timestamp, *duration, *volume).await?;
            }

            SoundAction::UpdateSfx {
                sfx_id,
                prompt,
                timestamp,
                volume,
            } => {
                let clip_duration = self.clip_duration();
                let idx = self
                    .clip
                    .sfx
                    .iter()
                    .position(|item| &item.id == sfx_id)
                    .ok_or_else(|| WorkerError::not_found(format!("sound effect {} on clip {}", sfx_id, self.clip.id)))?;

                let mut item = self.clip.sfx[idx].clone();
                if let Some(t) = timestamp {
                    item.timestamp = *t;
                }
                if volume.is_some() {
                    item.volume = *volume;
                }
                let new_prompt = prompt.as_deref().map(str::trim).filter(|p| *p != item.prompt);
                if let Some(p) = new_prompt {
                    item.prompt = p.to_string();
                }
                check_item(&item, clip_duration)?;

                if new_prompt.is_some() {
                    item.audio_url = self
                        .generate_audio(SoundObject::Sfx(&item.id), &item.prompt, SoundKind::Effect, item.duration, true)
                        .await?;
                }
                self.clip.sfx[idx] = item;
            }

            SoundAction::DeleteSfx { sfx_id } => {
                let idx = self
                    .clip
                    .sfx
                    .iter()
                    .position(|item| &item.id == sfx_id)
                    .ok_or_else(|| WorkerError::not_found(format!("sound effect {} on clip {}", sfx_id, self.clip.id)))?;
                let removed = self.clip.sfx.remove(idx);
                self.touched
                    .obsolete
                    .push(sound_object_path(&self.clip.id, SoundObject::Sfx(&removed.id)));
            }

            SoundAction::SetMusic { prompt, volume } => {
                let duration = SoundKind::Music.clamp_duration(self.clip_duration());
                let mut music = BackgroundMusic {
                    prompt: prompt.trim().to_string(),
                    audio_url: String::new(),
                    duration,
                    volume: *volume,
                };
                music.validate().map_err(invalid)?;
                music.audio_url = self
                    .generate_audio(SoundObject::Music, &music.prompt, SoundKind::Music, duration, true)
                    .await?;
                self.clip.background_music = Some(music);
            }

            SoundAction::ClearMusic => {
                if self.clip.background_music.take().is_some() {
                    self.touched
                        .obsolete
                        .push(sound_object_path(&self.clip.id, SoundObject::Music));
                }
            }

            SoundAction::Remix => {}
        }
        Ok(())
    }

    /// Re-mix the clip from its current sound fields.
    async fn remix(&mut self) -> WorkerResult<()> {
        let layers = sound_layers(&self.clip);
        let key = mixed_video_path(&self.clip.id);

        if layers.is_empty() {
            if self.clip.mixed_video_url.take().is_some() {
                self.touched.obsolete.push(key);
            }
            return Ok(());
        }

        let public_url = self
            .clip
            .public_url
            .clone()
            .ok_or_else(|| WorkerError::invalid_job(format!("clip {} has not been cut", self.clip.id)))?;
        let output = self.scratch.join("mixed.mp4");
        self.ctx.media.mix(&public_url, &layers, &output).await?;

        let bucket = self.ctx.objects.processed_bucket();
        self.ctx
            .objects
            .upload(&output, &bucket, &key, &UploadOptions::video_mp4_mutable())
            .await?;
        self.clip.mixed_video_url = Some(self.ctx.objects.public_url(&key));
        self.logger
            .log_stage("mixing", &format!("Mixed {} sound layers", layers.len()));
        Ok(())
    }
}

fn require_cut(clip: &Clip) -> WorkerResult<()> {
    if clip.public_url.is_none() || clip.storage_path.is_none() {
        return Err(WorkerError::invalid_job(format!("clip {} has not been cut", clip.id)));
    }
    Ok(())
}

/// Run one sound action against a clip and store the result.
pub async fn apply_sound_action(
    ctx: &JobContext,
    clip_id: &ClipId,
    action: &SoundAction,
    logger: &JobLogger,
) -> WorkerResult<Clip> {
    let clip = ctx
        .store
        .get_clip(clip_id)
        .await?
        .ok_or_else(|| WorkerError::not_found(format!("clip {}", clip_id)))?;
    require_cut(&clip)?;

    let scratch = ScratchDir::new_in(&ctx.config.work_dir, &format!("sound-{}-", clip_id))?;
    let mut run = SoundRun {
        ctx,
        clip,
        scratch,
        touched: Touched::default(),
        logger,
    };

    let outcome = async {
        run.apply(action).await?;
        run.remix().await?;
        ctx.store
            .update_clip_sound(clip_id, &ClipSoundUpdate::from_clip(&run.clip))
            .await?;
        Ok::<(), WorkerError>(())
    }
    .await;

    let SoundRun { clip, scratch, touched, .. } = run;
    drop(scratch);

    match outcome {
        Ok(()) => {
            delete_objects_best_effort(ctx.objects.as_ref(), touched.obsolete).await;
            info!(
                clip_id = %clip_id,
                action = action.name(),
                sfx = clip.sfx.len(),
                music = clip.background_music.is_some(),
                mixed = clip.mixed_video_url.is_some(),
                "Sound update stored"
            );
            Ok(clip)
        }
        Err(e) => {
            delete_objects_best_effort(ctx.objects.as_ref(), touched.created).await;
            Err(e)
        }
    }
}
