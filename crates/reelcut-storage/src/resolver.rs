//! Locating uploaded source videos despite path drift.
//!
//! Upload paths are recorded before the bytes exist, and buckets and key
//! layouts have changed over time. The resolver first probes an ordered set
//! of (bucket, key) candidates derived from the stored path and hints, then
//! falls back to a page-capped listing scan matching on file name.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectRef, ObjectStore};

/// Extra facts about the upload that help find it.
#[derive(Debug, Clone, Default)]
pub struct ResolveHints {
    pub project_id: Option<String>,
    pub original_filename: Option<String>,
}

pub struct IngestResolver {
    store: Arc<dyn ObjectStore>,
    primary_bucket: String,
    fallback_bucket: Option<String>,
    max_scan_pages: u32,
}

const URL_SCHEMES: [&str; 3] = ["s3://", "gs://", "r2://"];

fn push_unique(list: &mut Vec<String>, value: impl Into<String>) {
    let value = value.into();
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn push_failed<'a>(failed: &mut Vec<&'a String>, bucket: &'a String) {
    if !failed.contains(&bucket) {
        failed.push(bucket);
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

impl IngestResolver {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        primary_bucket: impl Into<String>,
        fallback_bucket: Option<String>,
        max_scan_pages: u32,
    ) -> Self {
        Self {
            store,
            primary_bucket: primary_bucket.into(),
            fallback_bucket,
            max_scan_pages: max_scan_pages.max(1),
        }
    }

    fn known_bucket(&self, name: &str) -> bool {
        name == self.primary_bucket || self.fallback_bucket.as_deref() == Some(name)
    }

    /// Split a stored path into an embedded bucket (if any) and the key part.
    pub fn split_stored_path(&self, stored: &str) -> (Option<String>, String) {
        let trimmed = stored.trim();

        for scheme in URL_SCHEMES {
            if let Some(rest) = trimmed.strip_prefix(scheme) {
                return match rest.split_once('/') {
                    Some((bucket, key)) => (Some(bucket.to_string()), key.to_string()),
                    None => (Some(rest.to_string()), String::new()),
                };
            }
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            if let Ok(url) = url::Url::parse(trimmed) {
                let path = url.path().trim_start_matches('/');
                if let Some((first, rest)) = path.split_once('/') {
                    if self.known_bucket(first) {
                        return (Some(first.to_string()), rest.to_string());
                    }
                }
                return (None, path.to_string());
            }
        }

        let without_slash = trimmed.trim_start_matches('/');
        if let Some((first, rest)) = without_slash.split_once('/') {
            if self.known_bucket(first) {
                return (Some(first.to_string()), rest.to_string());
            }
        }
        (None, trimmed.to_string())
    }

    /// Buckets to probe, in order: embedded, primary, fallback.
    pub fn bucket_candidates(&self, embedded: Option<&str>) -> Vec<String> {
        let mut buckets = Vec::new();
        if let Some(bucket) = embedded {
            push_unique(&mut buckets, bucket);
        }
        push_unique(&mut buckets, self.primary_bucket.clone());
        if let Some(fallback) = &self.fallback_bucket {
            push_unique(&mut buckets, fallback.clone());
        }
        buckets
    }

    /// Keys to probe, in order.
    pub fn path_candidates(key: &str, hints: &ResolveHints) -> Vec<String> {
        let mut paths = Vec::new();

        push_unique(&mut paths, key);
        if let Ok(decoded) = urlencoding::decode(key) {
            push_unique(&mut paths, decoded.into_owned());
        }

        let snapshot = paths.clone();
        for path in &snapshot {
            match path.strip_prefix('/') {
                Some(stripped) => push_unique(&mut paths, stripped),
                None => push_unique(&mut paths, format!("/{}", path)),
            }
        }

        for path in &snapshot {
            push_unique(&mut paths, basename(path));
        }

        if let Some(filename) = &hints.original_filename {
            push_unique(&mut paths, filename.trim());
        }

        if let Some(project) = &hints.project_id {
            if let Some(filename) = &hints.original_filename {
                push_unique(&mut paths, format!("{}/{}", project, filename.trim()));
            }
            for path in &snapshot {
                push_unique(&mut paths, format!("{}/{}", project, basename(path)));
            }
        }

        paths
    }

    /// Find the uploaded object, or `NotFound` once probes and scans are exhausted.
    ///
    /// A bucket whose probe or listing fails is skipped. The last store error
    /// is returned only when every candidate bucket failed.
    pub async fn resolve(&self, stored_path: &str, hints: &ResolveHints) -> StorageResult<ObjectRef> {
        let (embedded, key) = self.split_stored_path(stored_path);
        let buckets = self.bucket_candidates(embedded.as_deref());
        let paths = Self::path_candidates(&key, hints);

        // Buckets that failed in either pass; a failing bucket counts as a miss.
        let mut failed: Vec<&String> = Vec::new();
        let mut last_err = None;

        for bucket in &buckets {
            for path in &paths {
                match self.store.exists(bucket, path).await {
                    Ok(true) => {
                        if path != &key || Some(bucket) != embedded.as_ref() {
                            debug!(bucket = %bucket, key = %path, stored = stored_path, "Resolved upload by probe");
                        }
                        return Ok(ObjectRef::new(bucket.clone(), path.clone()));
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(bucket = %bucket, key = %path, error = %e, "Probe failed, skipping bucket");
                        push_failed(&mut failed, bucket);
                        last_err = Some(e);
                        break;
                    }
                }
            }
        }

        let mut names: Vec<String> = Vec::new();
        push_unique(&mut names, basename(&key));
        if let Ok(decoded) = urlencoding::decode(basename(&key)) {
            push_unique(&mut names, decoded.into_owned());
        }
        if let Some(filename) = &hints.original_filename {
            push_unique(&mut names, basename(filename.trim()));
        }

        let prefix = hints
            .project_id
            .as_ref()
            .map(|p| format!("{}/", p))
            .unwrap_or_default();

        for bucket in &buckets {
            match self.scan_bucket(bucket, &prefix, &names).await {
                Ok(Some(found)) => {
                    info!(bucket = %bucket, key = %found, stored = stored_path, "Resolved upload by listing scan");
                    return Ok(ObjectRef::new(bucket.clone(), found));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(bucket = %bucket, prefix = %prefix, error = %e, "Listing scan failed, skipping bucket");
                    push_failed(&mut failed, bucket);
                    last_err = Some(e);
                }
            }
        }

        warn!(
            stored = stored_path,
            buckets = ?buckets,
            failed_buckets = failed.len(),
            probes = paths.len() * buckets.len(),
            "Upload not found after probes and scan"
        );
        match last_err {
            Some(e) if failed.len() == buckets.len() => Err(e),
            _ => Err(StorageError::not_found(stored_path)),
        }
    }

    async fn scan_bucket(&self, bucket: &str, prefix: &str, names: &[String]) -> StorageResult<Option<String>> {
        if names.is_empty() {
            return Ok(None);
        }

        let mut token = None;
        for page_no in 0..self.max_scan_pages {
            let page = self.store.list_page(bucket, prefix, token).await?;
            if let Some(hit) = page.objects.iter().find(|obj| {
                names
                    .iter()
                    .any(|name| obj.key == *name || obj.key.ends_with(&format!("/{}", name)))
            }) {
                return Ok(Some(hit.key.clone()));
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(None),
            }
            if page_no + 1 == self.max_scan_pages {
                debug!(bucket, prefix, pages = self.max_scan_pages, "Listing scan hit page cap");
            }
        }
        Ok(None)
    }
}
