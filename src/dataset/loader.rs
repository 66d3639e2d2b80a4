//! Dataset loader
//!
//! Fetch bytes → parse → infer types → fingerprint. Transient blob failures
//! are retried with backoff; everything else surfaces immediately.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::blob::BlobStore;
use crate::observability::{Logger, MetricsRegistry, ObservationScope};
use crate::retry::{RetryError, RetryPolicy};

use super::errors::{LoadError, LoadResult};
use super::parser::parser_for;
use super::types::Dataset;

/// Where a dataset lives and what to call it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// Dataset name used in prompts and plans
    pub name: String,
    /// Blob path
    pub location: String,
}

impl SourceRef {
    /// Reference named after the location's file stem
    /// (`reports/sales-2024.csv` → `sales-2024`)
    pub fn new(location: impl Into<String>) -> LoadResult<Self> {
        let location = location.into();
        let file = location.rsplit('/').next().unwrap_or(&location);
        let stem = file.split_once('.').map(|(s, _)| s).unwrap_or(file);
        Self::named(stem.to_string(), location)
    }

    /// Reference with an explicit name
    pub fn named(name: impl Into<String>, location: impl Into<String>) -> LoadResult<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LoadError::InvalidName(name));
        }
        Ok(Self {
            name,
            location: location.into(),
        })
    }
}

impl FromStr for SourceRef {
    type Err = LoadError;

    /// `name=location` or just `location`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((name, location)) => Self::named(name.trim(), location.trim()),
            None => Self::new(s.trim()),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.location)
    }
}

/// Reads datasets out of a blob store
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl DatasetLoader {
    /// Create a loader
    pub fn new(store: Arc<dyn BlobStore>, retry: RetryPolicy, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Loads and types one dataset
    pub async fn load(&self, source: &SourceRef) -> LoadResult<Dataset> {
        let scope = ObservationScope::with_fields(
            "DATASET_LOAD",
            &[("dataset", &source.name), ("location", &source.location)],
        );

        match self.load_inner(source).await {
            Ok(dataset) => {
                self.metrics.increment_datasets_loaded();
                let rows = dataset.row_count().to_string();
                let columns = dataset.columns().len().to_string();
                scope.complete_with_fields(&[
                    ("columns", &columns),
                    ("fingerprint", dataset.fingerprint().short()),
                    ("rows", &rows),
                ]);
                Ok(dataset)
            }
            Err(e) => {
                self.metrics.increment_load_failures();
                scope.fail(e.code(), &e.to_string());
                Err(e)
            }
        }
    }

    async fn load_inner(&self, source: &SourceRef) -> LoadResult<Dataset> {
        let location = source.location.as_str();
        let store = &self.store;

        let bytes = self
            .retry
            .run(
                "blob_read",
                |e: &crate::blob::BlobError| e.is_transient(),
                |_| store.read(location),
            )
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => LoadError::Unavailable {
                    location: location.to_string(),
                    attempts,
                    reason: last.to_string(),
                },
                RetryError::Permanent(e) => LoadError::from_blob(location, e),
            })?;

        let parser = parser_for(location);
        Logger::trace(
            "DATASET_PARSE",
            &[("dataset", &source.name), ("format", parser.format())],
        );

        Dataset::parse(&source.name, location, &bytes, parser.as_ref()).map_err(|e| {
            LoadError::ParseFailure {
                location: location.to_string(),
                reason: e.0,
            }
        })
    }

    /// Writes raw bytes to the store so they can be loaded later
    pub async fn upload(&self, location: &str, bytes: &[u8]) -> LoadResult<()> {
        let store = &self.store;
        self.retry
            .run(
                "blob_write",
                |e: &crate::blob::BlobError| e.is_transient(),
                |_| store.write(location, bytes),
            )
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => LoadError::Unavailable {
                    location: location.to_string(),
                    attempts,
                    reason: last.to_string(),
                },
                RetryError::Permanent(e) => LoadError::Storage {
                    location: location.to_string(),
                    reason: e.to_string(),
                },
            })?;
        Logger::info(
            "DATASET_UPLOADED",
            &[("bytes", &bytes.len().to_string()), ("location", location)],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::dataset::ColumnType;

    fn loader(store: MemoryBlobStore) -> DatasetLoader {
        DatasetLoader::new(
            Arc::new(store),
            RetryPolicy::immediate(2),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[test]
    fn test_source_ref_parsing() {
        let r: SourceRef = "reports/sales-2024.csv".parse().unwrap();
        assert_eq!(r.name, "sales-2024");
        assert_eq!(r.location, "reports/sales-2024.csv");

        let r: SourceRef = "orders = q1/orders.json".parse().unwrap();
        assert_eq!(r.name, "orders");
        assert_eq!(r.location, "q1/orders.json");

        assert!("bad name=x.csv".parse::<SourceRef>().is_err());
    }

    #[tokio::test]
    async fn test_load_csv() {
        let store = MemoryBlobStore::with_blobs([("sales.csv", "region,sales\neast,10\n")]);
        let ds = loader(store).load(&SourceRef::new("sales.csv").unwrap()).await.unwrap();
        assert_eq!(ds.name(), "sales");
        assert_eq!(ds.column("sales").unwrap().column_type, ColumnType::Integer);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let err = loader(MemoryBlobStore::new())
            .load(&SourceRef::new("missing.csv").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err, LoadError::NotFound("missing.csv".into()));
    }

    #[tokio::test]
    async fn test_malformed_content_is_parse_failure() {
        let store = MemoryBlobStore::with_blobs([("bad.csv", "a,b\n1,2,3\n")]);
        let err = loader(store)
            .load(&SourceRef::new("bad.csv").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::ParseFailure { .. }));
    }

    #[tokio::test]
    async fn test_upload_then_load() {
        let l = loader(MemoryBlobStore::new());
        l.upload("up/new.csv", b"x\n1\n").await.unwrap();
        let ds = l.load(&SourceRef::new("up/new.csv").unwrap()).await.unwrap();
        assert_eq!(ds.row_count(), 1);
    }
}
