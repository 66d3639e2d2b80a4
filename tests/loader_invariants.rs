//! Dataset loader invariant tests
//!
//! Test Categories:
//! 1. Failure mapping: missing, unparseable, unavailable, forbidden
//! 2. Retry of transient reads
//! 3. Type inference
//! 4. Workbook ingestion
//! 5. Filesystem store round trip

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

use tabquery::blob::{BlobError, BlobResult, BlobStore, LocalBlobStore, MemoryBlobStore};
use tabquery::dataset::{CellValue, ColumnType, DatasetLoader, LoadError, SourceRef};
use tabquery::observability::MetricsRegistry;
use tabquery::retry::RetryPolicy;

// =============================================================================
// HELPERS
// =============================================================================

/// Fails the first `failures` reads with `error`, then serves `data`
#[derive(Debug)]
struct FlakyStore {
    failures: u32,
    error: BlobError,
    data: Vec<u8>,
    reads: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32, error: BlobError, data: &str) -> Self {
        Self {
            failures,
            error,
            data: data.as_bytes().to_vec(),
            reads: AtomicU32::new(0),
        }
    }

    fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FlakyStore {
    async fn read(&self, _path: &str) -> BlobResult<Vec<u8>> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(self.error.clone())
        } else {
            Ok(self.data.clone())
        }
    }

    async fn write(&self, _path: &str, _data: &[u8]) -> BlobResult<()> {
        Ok(())
    }

    async fn exists(&self, _path: &str) -> BlobResult<bool> {
        Ok(true)
    }

    async fn list(&self, _prefix: &str) -> BlobResult<Vec<String>> {
        Ok(Vec::new())
    }
}

fn loader(store: Arc<dyn BlobStore>) -> (DatasetLoader, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new());
    (
        DatasetLoader::new(store, RetryPolicy::immediate(2), Arc::clone(&metrics)),
        metrics,
    )
}

fn source(location: &str) -> SourceRef {
    SourceRef::new(location).unwrap()
}

// =============================================================================
// FAILURE MAPPING
// =============================================================================

#[tokio::test]
async fn test_missing_blob_is_not_found() {
    let (loader, metrics) = loader(Arc::new(MemoryBlobStore::new()));

    let err = loader.load(&source("sales.csv")).await.unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
    assert_eq!(metrics.snapshot().load_failures, 1);
}

#[tokio::test]
async fn test_bad_content_is_parse_failure() {
    let store = MemoryBlobStore::with_blobs([("sales.json", "this is not json")]);
    let (loader, _) = loader(Arc::new(store));

    let err = loader.load(&source("sales.json")).await.unwrap_err();
    assert!(matches!(err, LoadError::ParseFailure { ref location, .. } if location == "sales.json"));
}

#[tokio::test]
async fn test_ragged_csv_is_parse_failure() {
    let store = MemoryBlobStore::with_blobs([("sales.csv", "a,b\n1,2\n3\n")]);
    let (loader, _) = loader(Arc::new(store));

    let err = loader.load(&source("sales.csv")).await.unwrap_err();
    assert!(matches!(err, LoadError::ParseFailure { .. }));
}

/// Permanent storage failures are reported on the first attempt.
#[tokio::test]
async fn test_unauthorized_not_retried() {
    let store = Arc::new(FlakyStore::new(
        10,
        BlobError::Unauthorized("sales.csv".into()),
        "a\n1\n",
    ));
    let (loader, _) = loader(store.clone());

    let err = loader.load(&source("sales.csv")).await.unwrap_err();
    assert!(matches!(err, LoadError::Storage { .. }));
    assert_eq!(store.reads(), 1);
}

// =============================================================================
// TRANSIENT RETRY
// =============================================================================

#[tokio::test]
async fn test_transient_reads_are_retried() {
    let store = Arc::new(FlakyStore::new(
        2,
        BlobError::Transient("503".into()),
        "region,sales\neast,10\n",
    ));
    let (loader, metrics) = loader(store.clone());

    let dataset = loader.load(&source("sales.csv")).await.unwrap();
    assert_eq!(dataset.row_count(), 1);
    assert_eq!(store.reads(), 3);
    assert_eq!(metrics.snapshot().datasets_loaded, 1);
}

#[tokio::test]
async fn test_transient_exhaustion_is_unavailable() {
    let store = Arc::new(FlakyStore::new(
        10,
        BlobError::Transient("503".into()),
        "a\n1\n",
    ));
    let (loader, _) = loader(store.clone());

    let err = loader.load(&source("sales.csv")).await.unwrap_err();
    assert!(matches!(err, LoadError::Unavailable { attempts: 3, .. }));
    assert_eq!(store.reads(), 3);
}

// =============================================================================
// TYPE INFERENCE
// =============================================================================

/// Integers, decimals and digit-only codes are told apart.
#[tokio::test]
async fn test_inference_distinguishes_numeric_kinds() {
    let csv = "units,price,zip,label\n3,2.50,02139,a\n4,3,10001,b\n,1.25,00501,\n";
    let store = MemoryBlobStore::with_blobs([("items.csv", csv)]);
    let (loader, _) = loader(Arc::new(store));

    let dataset = loader.load(&source("items.csv")).await.unwrap();
    let units = dataset.column("units").unwrap();
    let price = dataset.column("price").unwrap();
    let zip = dataset.column("zip").unwrap();

    assert_eq!(units.column_type, ColumnType::Integer);
    assert_eq!(units.null_count, 1);
    assert_eq!(price.column_type, ColumnType::Decimal);
    assert_eq!(zip.column_type, ColumnType::Text);
    assert!(zip.numeric_text);

    assert_eq!(dataset.rows()[0][0], CellValue::Integer(3));
    assert_eq!(dataset.rows()[1][1], CellValue::Decimal(3.0));
    assert_eq!(dataset.rows()[0][2], CellValue::Text("02139".into()));
    assert_eq!(dataset.rows()[2][0], CellValue::Null);
}

#[tokio::test]
async fn test_json_records_load() {
    let json = r#"[{"region": "east", "sales": 10}, {"region": "west", "sales": null}]"#;
    let store = MemoryBlobStore::with_blobs([("sales.json", json)]);
    let (loader, _) = loader(Arc::new(store));

    let dataset = loader.load(&source("sales.json")).await.unwrap();
    assert_eq!(dataset.name(), "sales");
    assert_eq!(dataset.column("sales").unwrap().column_type, ColumnType::Integer);
    assert_eq!(dataset.rows()[1][1], CellValue::Null);
}

/// Identical bytes give identical fingerprints; different bytes do not.
#[tokio::test]
async fn test_fingerprint_tracks_content() {
    let store = MemoryBlobStore::with_blobs([
        ("a.csv", "x\n1\n"),
        ("b.csv", "x\n1\n"),
        ("c.csv", "x\n2\n"),
    ]);
    let (loader, _) = loader(Arc::new(store));

    let a = loader.load(&SourceRef::named("t", "a.csv").unwrap()).await.unwrap();
    let b = loader.load(&SourceRef::named("t", "b.csv").unwrap()).await.unwrap();
    let c = loader.load(&SourceRef::named("t", "c.csv").unwrap()).await.unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}

// =============================================================================
// WORKBOOKS
// =============================================================================

fn sales_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "region").unwrap();
    sheet.write_string(0, 1, "sales").unwrap();
    sheet.write_string(0, 2, "margin").unwrap();
    for (row, (region, sales, margin)) in [("east", 10, 0.25), ("west", 20, 0.5), ("east", 5, 1.0)]
        .into_iter()
        .enumerate()
    {
        let row = row as u32 + 1;
        sheet.write_string(row, 0, region).unwrap();
        sheet.write_number(row, 1, sales).unwrap();
        sheet.write_number(row, 2, margin).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// The first sheet of an `.xlsx` blob loads with its header row and the
/// same type inference as delimited text.
#[tokio::test]
async fn test_xlsx_first_sheet_loads() {
    let store = MemoryBlobStore::with_blobs([("q1/sales.xlsx", sales_workbook())]);
    let (loader, _) = loader(Arc::new(store));

    let dataset = loader.load(&source("q1/sales.xlsx")).await.unwrap();
    assert_eq!(dataset.name(), "sales");
    assert_eq!(dataset.row_count(), 3);
    assert_eq!(dataset.column("region").unwrap().column_type, ColumnType::Text);
    assert_eq!(dataset.column("sales").unwrap().column_type, ColumnType::Integer);
    assert_eq!(dataset.column("margin").unwrap().column_type, ColumnType::Decimal);
    assert_eq!(dataset.rows()[1][1], CellValue::Integer(20));
    assert_eq!(dataset.rows()[0][2], CellValue::Decimal(0.25));
}

#[tokio::test]
async fn test_corrupt_workbook_is_parse_failure() {
    let store = MemoryBlobStore::with_blobs([("sales.xlsx", "region,sales\neast,10\n")]);
    let (loader, _) = loader(Arc::new(store));

    let err = loader.load(&source("sales.xlsx")).await.unwrap_err();
    assert!(matches!(err, LoadError::ParseFailure { ref location, .. } if location == "sales.xlsx"));
}

// =============================================================================
// SOURCE REFERENCES
// =============================================================================

#[test]
fn test_source_ref_parsing() {
    let named: SourceRef = "revenue=reports/2024/q1.csv".parse().unwrap();
    assert_eq!(named.name, "revenue");
    assert_eq!(named.location, "reports/2024/q1.csv");

    let bare: SourceRef = "reports/sales.tsv".parse().unwrap();
    assert_eq!(bare.name, "sales");

    assert!(matches!(
        "bad name=x.csv".parse::<SourceRef>(),
        Err(LoadError::InvalidName(_))
    ));
}

// =============================================================================
// FILESYSTEM STORE
// =============================================================================

#[tokio::test]
async fn test_local_store_upload_then_load() {
    let dir = TempDir::new().unwrap();
    let (loader, _) = loader(Arc::new(LocalBlobStore::new(dir.path())));

    loader
        .upload("reports/sales.csv", b"region,sales\neast,10\nwest,20\n")
        .await
        .unwrap();
    assert!(dir.path().join("reports").join("sales.csv").exists());

    let dataset = loader.load(&source("reports/sales.csv")).await.unwrap();
    assert_eq!(dataset.name(), "sales");
    assert_eq!(dataset.row_count(), 2);
    assert_eq!(dataset.source(), "reports/sales.csv");
}

#[tokio::test]
async fn test_local_store_missing_file() {
    let dir = TempDir::new().unwrap();
    let (loader, _) = loader(Arc::new(LocalBlobStore::new(dir.path())));

    let err = loader.load(&source("absent.csv")).await.unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}
