//! Per-invocation scratch directories.
//!
//! A [`ScratchDir`] owns a fresh directory under a configured root and
//! removes it, with everything inside, when dropped.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::warn;

use crate::error::MediaResult;

#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a new uniquely named directory under `root`.
    pub fn new_in(root: impl AsRef<Path>, prefix: &str) -> MediaResult<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Remove the directory now, reporting failures instead of logging them.
    pub fn close(mut self) -> MediaResult<()> {
        if let Some(dir) = self.dir.take() {
            dir.close()?;
        }
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(path = %self.path.display(), "Failed to remove scratch dir: {}", e);
            }
        }
    }
}
