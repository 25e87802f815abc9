//! Locating and fetching a video's source upload.
//!
//! The upload is resolved through the [`IngestResolver`] first, so stale
//! stored paths (renamed buckets, moved files) still find the object, then
//! downloaded into a job-owned scratch directory.
//!
//! [`IngestResolver`]: reelcut_storage::IngestResolver

use std::path::{Path, PathBuf};
use tracing::info;

use reelcut_media::ScratchDir;
use reelcut_models::Video;
use reelcut_storage::{ObjectRef, ResolveHints};

use crate::context::JobContext;
use crate::error::WorkerResult;

/// The downloaded source. The local copy lives as long as this value.
#[derive(Debug)]
pub struct SourceVideo {
    pub object: ObjectRef,
    pub path: PathBuf,
    scratch: ScratchDir,
}

impl SourceVideo {
    /// Reference handed to services that read the object themselves.
    pub fn remote_ref(&self) -> String {
        format!("s3://{}/{}", self.object.bucket, self.object.key)
    }

    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.object.key)
    }

    /// Scratch directory shared by everything derived from this source.
    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    pub fn local_path(&self) -> &Path {
        &self.path
    }
}

pub fn mime_for(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

fn extension_of(key: &str) -> &str {
    match key.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') && ext.len() <= 5 => ext,
        _ => "mp4",
    }
}

/// Resolve the video's upload and download it into a fresh scratch directory.
pub async fn fetch_source(ctx: &JobContext, video: &Video) -> WorkerResult<SourceVideo> {
    let hints = ResolveHints {
        project_id: Some(video.project_id.clone()),
        original_filename: Some(video.original_filename.clone()).filter(|f| !f.trim().is_empty()),
    };
    let object = ctx.resolver.resolve(&video.upload_path, &hints).await?;

    let scratch = ScratchDir::new_in(&ctx.config.work_dir, &format!("{}-", video.id))?;
    let path = scratch.join(format!("source.{}", extension_of(&object.key)));
    ctx.objects.download(&object.bucket, &object.key, &path).await?;

    let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
    info!(
        video_id = %video.id,
        source = %object,
        size_mb = size as f64 / 1_048_576.0,
        "Downloaded source video"
    );

    Ok(SourceVideo { object, path, scratch })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("p1/talk.MOV"), "video/quicktime");
        assert_eq!(mime_for("p1/talk.webm"), "video/webm");
        assert_eq!(mime_for("p1/talk"), "video/mp4");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("p1/talk.mov"), "mov");
        assert_eq!(extension_of("p1.v2/talk"), "mp4");
        assert_eq!(extension_of("talk."), "mp4");
    }
}
