//! # Local Filesystem Blob Store

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::backend::{validate_path, BlobStore};
use super::errors::{BlobError, BlobResult};

/// Blob store rooted at a local directory
#[derive(Debug)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a new local store
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> BlobResult<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

fn map_io(e: std::io::Error, path: &str) -> BlobError {
    match e.kind() {
        ErrorKind::NotFound => BlobError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => BlobError::Unauthorized(path.to_string()),
        ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock => {
            BlobError::Transient(e.to_string())
        }
        _ => BlobError::Io(e.to_string()),
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn read(&self, path: &str) -> BlobResult<Vec<u8>> {
        let full_path = self.full_path(path)?;
        tokio::fs::read(&full_path).await.map_err(|e| map_io(e, path))
    }

    async fn write(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        let full_path = self.full_path(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| map_io(e, path))?;
        }

        tokio::fs::write(&full_path, data)
            .await
            .map_err(|e| map_io(e, path))
    }

    async fn exists(&self, path: &str) -> BlobResult<bool> {
        let full_path = self.full_path(path)?;
        tokio::fs::try_exists(&full_path)
            .await
            .map_err(|e| map_io(e, path))
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let prefix = prefix.trim_matches('/');
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.full_path(prefix)?
        };

        let mut results = Vec::new();
        if !dir.is_dir() {
            return Ok(results);
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| map_io(e, prefix))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| map_io(e, prefix))? {
            if let Some(name) = entry.file_name().to_str() {
                if prefix.is_empty() {
                    results.push(name.to_string());
                } else {
                    results.push(format!("{}/{}", prefix, name));
                }
            }
        }
        results.sort();
        Ok(results)
    }
}
