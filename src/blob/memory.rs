//! # In-Memory Blob Store

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::backend::{validate_path, BlobStore};
use super::errors::{BlobError, BlobResult};

/// Blob store held in process memory (demos, dashboards, tests)
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with blobs
    pub fn with_blobs<I, P, B>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (P, B)>,
        P: Into<String>,
        B: Into<Vec<u8>>,
    {
        let map = blobs
            .into_iter()
            .map(|(p, b)| (p.into(), b.into()))
            .collect();
        Self {
            blobs: RwLock::new(map),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, path: &str) -> BlobResult<Vec<u8>> {
        validate_path(path)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Io("lock poisoned".into()))?;
        blobs
            .get(path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, data: &[u8]) -> BlobResult<()> {
        validate_path(path)?;
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobError::Io("lock poisoned".into()))?;
        blobs.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> BlobResult<bool> {
        validate_path(path)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Io("lock poisoned".into()))?;
        Ok(blobs.contains_key(path))
    }

    async fn list(&self, prefix: &str) -> BlobResult<Vec<String>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| BlobError::Io("lock poisoned".into()))?;
        Ok(blobs
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_overwrite() {
        let store = MemoryBlobStore::new();
        store.write("sales.csv", b"a").await.unwrap();
        store.write("sales.csv", b"b").await.unwrap();
        assert_eq!(store.read("sales.csv").await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let store = MemoryBlobStore::with_blobs([
            ("q1/a.csv", "x"),
            ("q1/b.csv", "y"),
            ("q2/c.csv", "z"),
        ]);
        assert_eq!(store.list("q1/").await.unwrap(), vec!["q1/a.csv", "q1/b.csv"]);
        assert!(!store.exists("q3/d.csv").await.unwrap());
    }
}
