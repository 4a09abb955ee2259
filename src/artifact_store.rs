//! Local directory holding artifacts fetched from the pipeline.
//!
//! Artifacts are addressed by bare filename only; anything that could
//! escape the directory is rejected.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
#[error("invalid artifact filename: {0:?}")]
pub struct InvalidFilename(pub String);

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a filename inside the store.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, InvalidFilename> {
        validate_filename(filename)?;
        Ok(self.root.join(filename))
    }

    /// Write an artifact, creating the directory on first use.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(filename)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("Failed to create download dir {:?}", self.root))?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write artifact {:?}", path))?;
        debug!("ArtifactStore: wrote {:?} ({} bytes)", path, data.len());
        Ok(path)
    }

    /// Read an artifact back. `Ok(None)` when it does not exist.
    pub async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read artifact {:?}", path)),
        }
    }
}

fn validate_filename(filename: &str) -> Result<(), InvalidFilename> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\', '\0'])
        || filename.contains("..");
    if bad {
        Err(InvalidFilename(filename.to_string()))
    } else {
        Ok(())
    }
}

/// Content type for a served artifact, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "gif" => "image/gif",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "srt" => "application/x-subrip",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
