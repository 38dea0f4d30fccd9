//! Result file placement.
//!
//! Results are named by a fresh UUID rather than the task id, so client
//! supplied ids never end up in a filesystem path.

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use voxgate_core::AudioFormat;

/// Directory holding finished task artifacts.
#[derive(Debug, Clone)]
pub struct ResultFiles {
    dir: PathBuf,
}

impl ResultFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one artifact and return where it landed.
    ///
    /// Written under a temporary name and renamed, so a reader never sees a
    /// partial file.
    pub async fn write(&self, format: AudioFormat, bytes: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = Uuid::new_v4();
        let partial = self.dir.join(format!(".{name}.part"));
        let path = self.dir.join(format!("{name}.{}", format.extension()));

        tokio::fs::write(&partial, bytes).await?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
        Ok(path)
    }

    /// Delete an artifact; a missing file is not an error.
    pub async fn remove(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    target: "voxgate.tasks",
                    path = %path.display(),
                    error = %e,
                    "Failed to delete result file"
                );
            }
        }
    }
}
