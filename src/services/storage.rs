//! Avatar object storage abstraction.
//!
//! Profiles reference avatars by opaque key; the storage backend owns the
//! bytes. Local filesystem is the only backend shipped, but the trait keeps
//! the door open for an S3-style store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(String),
}

/// Storage backend for avatar objects.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Remove the object at `key`. Deleting an object that no longer
    /// exists is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Local filesystem avatar storage.
pub struct LocalAvatarStorage {
    base_path: PathBuf,
}

impl LocalAvatarStorage {
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Keys must be flat file names; anything that could escape the base
    /// directory is rejected before touching the filesystem.
    fn resolve_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty()
            || key.contains("..")
            || key.contains('/')
            || key.contains('\\')
            || key.starts_with('.')
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.base_path.join(key))
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve_key(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted avatar object: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Avatar object already gone: {}", path.display());
                Ok(())
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_key_rejects_traversal() {
        let storage = LocalAvatarStorage::new("avatars");

        assert!(storage.resolve_key("../etc/passwd").is_err());
        assert!(storage.resolve_key("a/b.png").is_err());
        assert!(storage.resolve_key("..").is_err());
        assert!(storage.resolve_key(".hidden").is_err());
        assert!(storage.resolve_key("").is_err());
    }

    #[test]
    fn test_resolve_key_accepts_flat_names() {
        let storage = LocalAvatarStorage::new("avatars");

        assert!(storage.resolve_key("7f9c0a.png").is_ok());
        assert!(storage.resolve_key("avatar-12_final.jpg").is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let dir = std::env::temp_dir().join(format!("askhub-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let storage = LocalAvatarStorage::new(&dir);
        assert!(storage.delete_object("nothing-here.png").await.is_ok());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_existing_object() {
        let dir = std::env::temp_dir().join(format!("askhub-test-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let file = dir.join("avatar.png");
        tokio::fs::write(&file, b"png").await.unwrap();

        let storage = LocalAvatarStorage::new(&dir);
        storage.delete_object("avatar.png").await.unwrap();
        assert!(!file.exists());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
