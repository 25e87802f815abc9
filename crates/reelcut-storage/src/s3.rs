//! S3-compatible client implementation.

use async_trait::async_trait;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::store::{ListPage, ObjectInfo, ObjectStore, UploadOptions};

/// Object store backed by one S3-compatible endpoint, addressing any bucket on it.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    processed_bucket: String,
    public_base_url: String,
}

impl S3Store {
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "reelcut",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            processed_bucket: config.processed_bucket.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check connectivity by heading the processed bucket.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.processed_bucket)
            .send()
            .await
            .map_err(|e| StorageError::Sdk(format!("connectivity check failed: {}", e)))?;
        Ok(())
    }
}

/// Percent-encode each path segment, keeping the separators.
pub(crate) fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                    || e.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::Sdk(format!("head {}/{}: {}", bucket, key, e)))
                }
            }
        }
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> StorageResult<()> {
        debug!("Downloading {}/{} to {}", bucket, key, dest.display());

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    StorageError::not_found(format!("{}/{}", bucket, key))
                } else {
                    StorageError::download_failed(format!("{}/{}: {}", bucket, key, e))
                }
            })?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = response.body.into_async_read();
        let mut file = tokio::fs::File::create(dest).await?;
        let bytes = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        info!("Downloaded {}/{} ({} bytes) to {}", bucket, key, bytes, dest.display());
        Ok(())
    }

    async fn upload(&self, src: &Path, bucket: &str, key: &str, options: &UploadOptions) -> StorageResult<()> {
        debug!("Uploading {} to {}/{}", src.display(), bucket, key);

        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{} (reading source): {}", src.display(), e)))?;

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(&options.content_type);
        if let Some(cache_control) = &options.cache_control {
            request = request.cache_control(cache_control);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}/{}: {}", bucket, key, e)))?;

        info!("Uploaded {} to {}/{}", src.display(), bucket, key);
        Ok(())
    }

    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<String>) -> StorageResult<ListPage> {
        let mut request = self.client.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::ListFailed(format!("{}/{}: {}", bucket, prefix, e)))?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|obj| {
                Some(ObjectInfo {
                    key: obj.key()?.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                })
            })
            .collect();

        let next_token = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage { objects, next_token })
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        debug!("Deleting {}/{}", bucket, key);
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(format!("{}/{}: {}", bucket, key, e)))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_key(key))
    }

    fn processed_bucket(&self) -> String {
        self.processed_bucket.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(encode_key("p1/v1/big reveal.mp4"), "p1/v1/big%20reveal.mp4");
        assert_eq!(encode_key("sounds/c1/sfx-a.mp3"), "sounds/c1/sfx-a.mp3");
    }
}
