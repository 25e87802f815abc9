//! Object store abstraction used by the pipeline.

use async_trait::async_trait;
use std::path::Path;

use crate::error::StorageResult;

/// Bucket plus key of an object confirmed to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Information about a stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// Upload metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub content_type: String,
    pub cache_control: Option<String>,
}

impl UploadOptions {
    pub fn video_mp4() -> Self {
        Self {
            content_type: "video/mp4".to_string(),
            cache_control: Some("public, max-age=31536000".to_string()),
        }
    }

    pub fn audio_mpeg() -> Self {
        Self {
            content_type: "audio/mpeg".to_string(),
            cache_control: Some("public, max-age=31536000".to_string()),
        }
    }

    /// Objects overwritten in place (mixed clips) must not be cached for long.
    pub fn video_mp4_mutable() -> Self {
        Self {
            content_type: "video/mp4".to_string(),
            cache_control: Some("no-cache".to_string()),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Download to a local file, creating parent directories.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()>;

    async fn upload(&self, src: &Path, bucket: &str, key: &str, options: &UploadOptions) -> StorageResult<()>;

    /// List one page under `prefix` (empty for the whole bucket).
    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<String>) -> StorageResult<ListPage>;

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Public URL of an object in the processed bucket.
    fn public_url(&self, key: &str) -> String;

    /// Bucket for cut clips and generated media.
    fn processed_bucket(&self) -> String;
}
