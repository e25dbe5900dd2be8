//! Media file storage.
//!
//! Uploaded files are stored under a media root and referenced in the database
//! by their path relative to that root, e.g. `posts/3f2a....jpg`.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::StorageError;

/// Where uploaded files live.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` under `dir` with a fresh file name and return the relative path.
    async fn save(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Remove a stored file. Missing files and IO failures are logged, never returned.
    async fn delete(&self, path: &str);

    /// Public URL of a stored file.
    fn url(&self, path: &str) -> String;
}

/// Media store backed by the local filesystem.
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative media path, refusing anything that escapes the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || path.is_empty() {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(&self, dir: &str, extension: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let relative = format!("{}/{}.{}", dir, Uuid::new_v4().simple(), extension);
        let target = self
            .resolve(&relative)
            .ok_or_else(|| StorageError::Media(format!("Invalid media path: {}", relative)))?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Media(format!("Failed to create {}: {}", dir, e)))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StorageError::Media(format!("Failed to write {}: {}", relative, e)))?;

        debug!("Stored media file {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }

    async fn delete(&self, path: &str) {
        let Some(target) = self.resolve(path) else {
            warn!("Refusing to delete media outside the media root: {}", path);
            return;
        };
        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!("Deleted media file {}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Media file {} already gone", path)
            }
            Err(e) => warn!("Failed to delete media file {}: {}", path, e),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}
