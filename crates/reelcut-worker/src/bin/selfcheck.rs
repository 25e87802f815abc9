//! Deployment self-check: tools on PATH, writable work dir, configuration loads.

use std::path::Path;

use reelcut_ai::{AudioGenConfig, GeminiConfig, ShotServiceConfig, TranscriptionConfig};
use reelcut_firestore::FirestoreConfig;
use reelcut_media::{check_ffmpeg, check_ffprobe};
use reelcut_storage::StorageConfig;
use reelcut_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!("reelcut-selfcheck: starting with work_dir={}", config.work_dir);
    ensure_workdir(&config.work_dir).await?;

    let ffmpeg = check_ffmpeg()?;
    let ffprobe = check_ffprobe()?;
    println!("reelcut-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    StorageConfig::from_env()?;
    FirestoreConfig::from_env()?;
    GeminiConfig::from_env()?;
    TranscriptionConfig::from_env()?;
    ShotServiceConfig::from_env()?;
    if let Err(e) = AudioGenConfig::from_env() {
        println!("reelcut-selfcheck: warning: sound operations unavailable: {}", e);
    }

    println!("reelcut-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}
