//! Local filesystem media storage.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use yatube_core::ports::{MediaStorage, StorageError};

/// Stores uploads beneath a media root directory.
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative media path, refusing anything that escapes the root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let path = Path::new(relative);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl MediaStorage for FileSystemStorage {
    async fn save(
        &self,
        upload_to: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let dir = self.resolve(upload_to)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        tokio::fs::write(dir.join(&name), bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        let relative = format!("{}/{}", upload_to.trim_end_matches('/'), name);
        tracing::debug!(path = %relative, size = bytes.len(), "Stored media file");
        Ok(relative)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_under_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        let path = storage.save("posts", "gif", b"GIF89a").await.unwrap();

        assert!(path.starts_with("posts/") && path.ends_with(".gif"));
        let stored = tokio::fs::read(dir.path().join(&path)).await.unwrap();
        assert_eq!(stored, b"GIF89a");

        storage.delete(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());
        // Deleting twice is fine.
        storage.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        assert!(matches!(
            storage.save("../outside", "gif", b"x").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            storage.delete("/etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
