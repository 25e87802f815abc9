//! Services a job run works with, constructed once per process.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use reelcut_ai::{
    AudioGenClient, AudioGenerator, GeminiClient, GenerativeModel, ShotDetector, ShotServiceClient,
    Transcriber, WhisperClient,
};
use reelcut_firestore::{FirestoreClient, FirestoreStore, VideoStore};
use reelcut_media::{FfmpegToolkit, MediaToolkit};
use reelcut_models::EncodingConfig;
use reelcut_storage::{IngestResolver, ObjectStore, S3Store, StorageConfig};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

pub struct JobContext {
    pub config: WorkerConfig,
    pub store: Arc<dyn VideoStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub resolver: IngestResolver,
    pub media: Arc<dyn MediaToolkit>,
    pub model: Arc<dyn GenerativeModel>,
    pub transcriber: Arc<dyn Transcriber>,
    pub shots: Arc<dyn ShotDetector>,
    /// Only sound operations need it
    pub audio: Option<Arc<dyn AudioGenerator>>,
}

impl JobContext {
    /// Build production services from the environment.
    ///
    /// Fails before any work starts when a credential is missing. The audio
    /// generator is optional unless `require_audio` is set.
    pub async fn from_env(config: WorkerConfig, require_audio: bool) -> WorkerResult<Self> {
        let storage = StorageConfig::from_env()?;
        let objects: Arc<dyn ObjectStore> = Arc::new(S3Store::new(&storage));
        let resolver = IngestResolver::new(
            objects.clone(),
            storage.upload_bucket.clone(),
            storage.fallback_bucket.clone(),
            storage.scan_max_pages,
        );

        let store: Arc<dyn VideoStore> = Arc::new(FirestoreStore::new(FirestoreClient::from_env().await?));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| WorkerError::config_error(format!("failed to build HTTP client: {}", e)))?;
        let media: Arc<dyn MediaToolkit> = Arc::new(FfmpegToolkit::new(
            config.silence,
            EncodingConfig::default(),
            http,
            &config.work_dir,
        ));

        let audio: Option<Arc<dyn AudioGenerator>> = match AudioGenClient::from_env() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) if require_audio => return Err(e.into()),
            Err(e) => {
                warn!("Audio generation disabled: {}", e);
                None
            }
        };

        info!(
            upload_bucket = %storage.upload_bucket,
            processed_bucket = %storage.processed_bucket,
            audio = audio.is_some(),
            "Job context ready"
        );

        Ok(Self {
            store,
            objects,
            resolver,
            media,
            model: Arc::new(GeminiClient::from_env()?),
            transcriber: Arc::new(WhisperClient::from_env()?),
            shots: Arc::new(ShotServiceClient::from_env()?),
            audio,
            config,
        })
    }

    pub fn audio(&self) -> WorkerResult<&dyn AudioGenerator> {
        self.audio
            .as_deref()
            .ok_or_else(|| WorkerError::config_error("AUDIO_GEN_API_KEY not set; sound generation unavailable"))
    }
}
