//! Directory-per-reference store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use voxgate_core::{ReferenceAudio, ReferenceError, ReferenceId, ReferenceRepository};

const AUDIO_FILE: &str = "sample.wav";
const TEXT_FILE: &str = "sample.lab";
const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";

/// Audio extensions recognised in hand-placed reference directories.
const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a"];

/// Reference store backed by one directory per voice.
pub struct FsReferenceStore {
    root: PathBuf,
    // Guards the directory tree: reads share, mutations are exclusive.
    lock: RwLock<()>,
}

impl FsReferenceStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Leftover staging and trash directories from an interrupted run are
    /// removed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ReferenceError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;

        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(STAGING_PREFIX) || name.starts_with(TRASH_PREFIX) {
                tracing::debug!(
                    target: "voxgate.references",
                    path = %entry.path().display(),
                    "Removing leftover directory"
                );
                let _ = fs::remove_dir_all(entry.path()).await;
            }
        }

        tracing::info!(
            target: "voxgate.references",
            root = %root.display(),
            "Reference store opened"
        );

        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, id: &ReferenceId) -> PathBuf {
        self.root.join(id.as_str())
    }

    fn scratch_dir(&self, prefix: &str) -> PathBuf {
        self.root
            .join(format!("{prefix}{}", uuid::Uuid::new_v4().simple()))
    }

    async fn read_entry(dir: &Path) -> Result<ReferenceAudio, std::io::Error> {
        match Self::read_pair(&dir.join(AUDIO_FILE), &dir.join(TEXT_FILE)).await {
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            other => return other,
        }

        // Hand-placed directories: first audio file with a matching `.lab`.
        let mut candidates = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_audio = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_audio && fs::try_exists(path.with_extension("lab")).await.unwrap_or(false) {
                candidates.push(path);
            }
        }
        candidates.sort();

        match candidates.first() {
            Some(audio) => Self::read_pair(audio, &audio.with_extension("lab")).await,
            None => Err(std::io::Error::new(
                ErrorKind::NotFound,
                "no audio/transcript pair in reference directory",
            )),
        }
    }

    async fn read_pair(audio: &Path, text: &Path) -> Result<ReferenceAudio, std::io::Error> {
        let audio = fs::read(audio).await?;
        let text = fs::read_to_string(text).await?;
        Ok(ReferenceAudio { audio, text })
    }
}

#[async_trait]
impl ReferenceRepository for FsReferenceStore {
    async fn add(&self, id: &ReferenceId, audio: &[u8], text: &str) -> Result<(), ReferenceError> {
        // Stage outside the lock; only the final move is serialized.
        let staging = self.scratch_dir(STAGING_PREFIX);
        let staged = async {
            fs::create_dir(&staging).await?;
            fs::write(staging.join(AUDIO_FILE), audio).await?;
            fs::write(staging.join(TEXT_FILE), text).await
        }
        .await;
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging).await;
            return Err(e.into());
        }

        let target = self.entry_dir(id);
        let result = {
            let _guard = self.lock.write().await;
            if fs::try_exists(&target).await? {
                Err(ReferenceError::AlreadyExists(id.to_string()))
            } else {
                fs::rename(&staging, &target).await.map_err(Into::into)
            }
        };

        if result.is_err() {
            let _ = fs::remove_dir_all(&staging).await;
        } else {
            tracing::info!(target: "voxgate.references", id = %id, "Reference added");
        }
        result
    }

    async fn list(&self) -> Result<Vec<ReferenceId>, ReferenceError> {
        let _guard = self.lock.read().await;

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Ok(id) = ReferenceId::parse(name) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, id: &ReferenceId) -> Result<(), ReferenceError> {
        let trash = self.scratch_dir(TRASH_PREFIX);
        {
            let _guard = self.lock.write().await;
            let target = self.entry_dir(id);
            if !fs::try_exists(&target).await? {
                return Err(ReferenceError::NotFound(id.to_string()));
            }
            fs::rename(&target, &trash).await?;
        }

        // The id is already free; the bytes can go at leisure.
        if let Err(e) = fs::remove_dir_all(&trash).await {
            tracing::warn!(
                target: "voxgate.references",
                path = %trash.display(),
                error = %e,
                "Failed to remove deleted reference files"
            );
        }
        tracing::info!(target: "voxgate.references", id = %id, "Reference deleted");
        Ok(())
    }

    async fn rename(&self, old: &ReferenceId, new: &ReferenceId) -> Result<(), ReferenceError> {
        let _guard = self.lock.write().await;

        let from = self.entry_dir(old);
        if !fs::try_exists(&from).await? {
            return Err(ReferenceError::NotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        let to = self.entry_dir(new);
        if fs::try_exists(&to).await? {
            return Err(ReferenceError::AlreadyExists(new.to_string()));
        }
        fs::rename(&from, &to).await?;

        tracing::info!(
            target: "voxgate.references",
            old = %old,
            new = %new,
            "Reference renamed"
        );
        Ok(())
    }

    async fn get(&self, id: &ReferenceId) -> Result<ReferenceAudio, ReferenceError> {
        let _guard = self.lock.read().await;

        let dir = self.entry_dir(id);
        if !fs::try_exists(&dir).await? {
            return Err(ReferenceError::NotFound(id.to_string()));
        }
        Self::read_entry(&dir).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => ReferenceError::NotFound(id.to_string()),
            _ => ReferenceError::Io(e),
        })
    }
}
