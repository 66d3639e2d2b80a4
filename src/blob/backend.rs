//! # Blob Store Trait

use async_trait::async_trait;

use super::errors::BlobResult;

/// Remote or local store of named byte blobs
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Read the whole blob at `path`
    async fn read(&self, path: &str) -> BlobResult<Vec<u8>>;

    /// Write (overwrite) the blob at `path`
    async fn write(&self, path: &str, data: &[u8]) -> BlobResult<()>;

    /// Check if a blob exists
    async fn exists(&self, path: &str) -> BlobResult<bool>;

    /// List blob paths under `prefix`
    async fn list(&self, prefix: &str) -> BlobResult<Vec<String>>;
}

/// Rejects empty paths and parent-directory traversal
pub(crate) fn validate_path(path: &str) -> BlobResult<()> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(|part| part == "..") {
        return Err(super::BlobError::InvalidPath(path.to_string()));
    }
    Ok(())
}
