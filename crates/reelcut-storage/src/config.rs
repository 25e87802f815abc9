//! Storage configuration.

use crate::error::{StorageError, StorageResult};

pub const DEFAULT_SCAN_MAX_PAGES: u32 = 10;

/// S3-compatible storage settings shared by every bucket the pipeline touches.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Region ("auto" for R2)
    pub region: String,
    /// Bucket uploads are written to
    pub upload_bucket: String,
    /// Legacy bucket searched when an upload is not in the primary bucket
    pub fallback_bucket: Option<String>,
    /// Bucket for cut clips, generated audio and mixed clips
    pub processed_bucket: String,
    /// Public base URL serving the processed bucket
    pub public_base_url: String,
    /// Page cap for listing scans
    pub scan_max_pages: u32,
}

fn required(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{} not set", name)))
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let scan_max_pages = match std::env::var("STORAGE_SCAN_MAX_PAGES") {
            Ok(v) => v.parse::<u32>().map_err(|_| {
                StorageError::config_error(format!("STORAGE_SCAN_MAX_PAGES is not a number: {}", v))
            })?,
            Err(_) => DEFAULT_SCAN_MAX_PAGES,
        };

        Ok(Self {
            endpoint_url: required("S3_ENDPOINT_URL")?,
            access_key_id: required("S3_ACCESS_KEY_ID")?,
            secret_access_key: required("S3_SECRET_ACCESS_KEY")?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
            upload_bucket: required("STORAGE_UPLOAD_BUCKET")?,
            fallback_bucket: std::env::var("STORAGE_FALLBACK_BUCKET")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            processed_bucket: required("STORAGE_PROCESSED_BUCKET")?,
            public_base_url: required("STORAGE_PUBLIC_BASE_URL")?,
            scan_max_pages: scan_max_pages.max(1),
        })
    }
}
