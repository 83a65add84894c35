// src/services/storage.rs
//! Blob storage for uploaded application documents

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::generate_upload_name;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("S3 operation failed: {0}")]
    S3Error(String),
}

/// Logical bucket of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobCategory {
    CvFiles,
    CoverLetters,
}

impl BlobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobCategory::CvFiles => "cv_files",
            BlobCategory::CoverLetters => "cover_letters",
        }
    }
}

/// `<category>/<random>.pdf`; every upload gets a fresh name.
pub fn new_blob_path(category: BlobCategory) -> String {
    format!("{}/{}.pdf", category.as_str(), generate_upload_name())
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, bytes: Bytes, category: BlobCategory) -> Result<String, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    fn url(&self, path: &str) -> String;

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
}

/// Files on local disk, served back through `GET /storage/*path`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        for category in [BlobCategory::CvFiles, BlobCategory::CoverLetters] {
            tokio::fs::create_dir_all(self.root.join(category.as_str()))
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }
        Ok(())
    }

    /// Resolves a stored path under the root, refusing anything that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, bytes: Bytes, category: BlobCategory) -> Result<String, StorageError> {
        let path = new_blob_path(category);
        let full_path = self.resolve(&path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        tokio::fs::write(&full_path, &bytes)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        info!(path = %path, size = bytes.len(), "File stored locally");
        Ok(path)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full_path = self.resolve(path)?;
        tokio::fs::try_exists(&full_path)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(path = %path, "Local file deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path, "Local file already absent");
                Ok(())
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/storage/{}",
            self.public_base_url.trim_end_matches('/'),
            path
        )
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve(path)?;
        match tokio::fs::read(&full_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("cv_filter_storage_{}", generate_upload_name()))
    }

    #[tokio::test]
    async fn test_local_store_round_trip() {
        let root = temp_root();
        let store = LocalBlobStore::new(&root, "http://localhost:8080/");
        store.init().await.unwrap();

        let path = store
            .store(Bytes::from_static(b"%PDF-1.4 test"), BlobCategory::CvFiles)
            .await
            .unwrap();
        assert!(path.starts_with("cv_files/"));
        assert!(path.ends_with(".pdf"));
        assert!(store.exists(&path).await.unwrap());
        assert_eq!(store.read(&path).await.unwrap(), b"%PDF-1.4 test");
        assert_eq!(
            store.url(&path),
            format!("http://localhost:8080/storage/{}", path)
        );

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
        // Deleting twice is not an error
        store.delete(&path).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_paths() {
        let root = temp_root();
        let store = LocalBlobStore::new(&root, "http://localhost");

        let first = store
            .store(Bytes::from_static(b"%PDF same"), BlobCategory::CoverLetters)
            .await
            .unwrap();
        let second = store
            .store(Bytes::from_static(b"%PDF same"), BlobCategory::CoverLetters)
            .await
            .unwrap();
        assert_ne!(first, second);

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let store = LocalBlobStore::new(temp_root(), "http://localhost");
        assert!(matches!(
            store.read("../etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            store.exists("/etc/passwd").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
