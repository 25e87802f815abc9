//! Object storage key conventions.

use std::collections::HashSet;

use crate::{ClipId, SfxId};

const MAX_SLUG_LEN: usize = 60;

/// Turn a clip title into a URL- and key-safe slug.
///
/// Only ASCII alphanumerics survive; runs of anything else collapse into a
/// single hyphen. Falls back to `clip` when nothing is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    let slug: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('-').to_string();

    if slug.is_empty() {
        "clip".to_string()
    } else {
        slug
    }
}

/// Hands out slugs unique within one video, suffixing the rank on collision.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    taken: HashSet<String>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a slug already in use, e.g. by clips that are being kept.
    pub fn reserve(&mut self, slug: impl Into<String>) {
        self.taken.insert(slug.into());
    }

    pub fn allocate(&mut self, title: &str, rank: u32) -> String {
        let base = slugify(title);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = if n == 1 {
                format!("{}-{}", base, rank)
            } else {
                format!("{}-{}-{}", base, rank, n)
            };
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Key of a cut clip: `{project_id}/{video_id}/{slug}.mp4`
pub fn clip_object_path(project_id: &str, video_id: &str, slug: &str) -> String {
    format!("{}/{}/{}.mp4", project_id, video_id, slug)
}

/// Type segment of a generated sound key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoundObject<'a> {
    Sfx(&'a SfxId),
    Music,
}

/// Key of generated audio: `sounds/{clip_id}/{type}.mp3`
pub fn sound_object_path(clip_id: &ClipId, object: SoundObject<'_>) -> String {
    match object {
        SoundObject::Sfx(id) => format!("sounds/{}/sfx-{}.mp3", clip_id, id),
        SoundObject::Music => format!("sounds/{}/music.mp3", clip_id),
    }
}

/// Key of the mixed clip: `sfx-videos/{clip_id}/output.mp4`
pub fn mixed_video_path(clip_id: &ClipId) -> String {
    format!("sfx-videos/{}/output.mp4", clip_id)
}
