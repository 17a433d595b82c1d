//! Media storage port - where uploaded post images end up.

use async_trait::async_trait;

/// Stores uploaded files and hands back their path relative to the media root.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` under the `upload_to` directory with a fresh name.
    async fn save(
        &self,
        upload_to: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError>;

    /// Remove a previously stored file. Missing files are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// Media storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O failed: {0}")]
    Io(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}
