//! HTTP download of media referenced by URL (clip videos, generated audio).

use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// Non-success responses and empty bodies are errors; a partially written
/// file is left for the caller's scratch directory to remove.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: impl AsRef<Path>,
) -> MediaResult<u64> {
    let dest = dest.as_ref();

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::download_failed(format!("GET {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MediaError::download_failed(format!(
            "GET {} returned {}",
            url, status
        )));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| MediaError::download_failed(format!("reading {}: {}", url, e)))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed(format!("{} returned an empty body", url)));
    }

    debug!(url, bytes = written, dest = %dest.display(), "Downloaded media");
    Ok(written)
}
