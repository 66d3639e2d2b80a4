//! Dataset types
//!
//! A `Dataset` is immutable once built. Reloading produces a new `Dataset`
//! that replaces the old `Arc` wholesale.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::infer::{convert, infer_column};
use super::parser::{CsvParser, ParseError, RawTable, TabularParser};
use super::value::{CellValue, ColumnType};

/// SHA-256 of a dataset's raw bytes, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of raw content
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column definition with inferred type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name as it appears in the header
    pub name: String,
    /// Inferred type
    pub column_type: ColumnType,
    /// Text column whose values are all digits (compare as text)
    pub numeric_text: bool,
    /// Number of empty cells
    pub null_count: usize,
}

/// A loaded, typed table
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    source: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<CellValue>>,
    fingerprint: Fingerprint,
    loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Types a raw table. Every column's type is inferred from its cells.
    pub fn from_raw(
        name: impl Into<String>,
        source: impl Into<String>,
        raw: RawTable,
        fingerprint: Fingerprint,
    ) -> Self {
        let RawTable { headers, rows } = raw;

        let columns: Vec<ColumnDef> = headers
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let cells = rows.iter().map(move |r| r.get(i).and_then(|c| c.as_deref()));
                let inferred = infer_column(cells.clone());
                ColumnDef {
                    name,
                    column_type: inferred.column_type,
                    numeric_text: inferred.numeric_text,
                    null_count: cells.filter(|c| c.is_none()).count(),
                }
            })
            .collect();

        let rows = rows
            .iter()
            .map(|raw_row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        convert(raw_row.get(i).and_then(|c| c.as_deref()), col.column_type)
                    })
                    .collect()
            })
            .collect();

        Self {
            name: name.into(),
            source: source.into(),
            columns,
            rows,
            fingerprint,
            loaded_at: Utc::now(),
        }
    }

    /// Parses bytes with `parser` and types the result
    pub fn parse(
        name: impl Into<String>,
        source: impl Into<String>,
        bytes: &[u8],
        parser: &dyn TabularParser,
    ) -> Result<Self, ParseError> {
        let raw = parser.parse(bytes)?;
        Ok(Self::from_raw(name, source, raw, Fingerprint::of_bytes(bytes)))
    }

    /// Builds a dataset from inline CSV text
    pub fn from_csv(name: impl Into<String>, csv: &str) -> Result<Self, ParseError> {
        let name = name.into();
        let source = format!("inline:{}", name);
        Self::parse(name, source, csv.as_bytes(), &CsvParser::csv())
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the bytes came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Columns in header order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Rows in file order
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Content fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// When this copy was built
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column definition by name
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Named datasets that a question is asked against
#[derive(Debug, Clone, Default)]
pub struct DatasetSet {
    datasets: BTreeMap<String, Arc<Dataset>>,
}

impl DatasetSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a dataset by name
    pub fn insert(&mut self, dataset: Arc<Dataset>) {
        self.datasets.insert(dataset.name().to_string(), dataset);
    }

    /// Builder-style insert
    pub fn with(mut self, dataset: Dataset) -> Self {
        self.insert(Arc::new(dataset));
        self
    }

    /// Dataset by name
    pub fn get(&self, name: &str) -> Option<&Arc<Dataset>> {
        self.datasets.get(name)
    }

    /// Datasets in name order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Dataset>> {
        self.datasets.values()
    }

    /// Names in order
    pub fn names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Number of datasets
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    /// Returns true if there are no datasets
    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// `(name, fingerprint)` pairs in name order
    pub fn fingerprints(&self) -> Vec<(String, Fingerprint)> {
        self.datasets
            .iter()
            .map(|(name, ds)| (name.clone(), ds.fingerprint().clone()))
            .collect()
    }

    /// Combined fingerprint of every member. Changes whenever any member
    /// is added, removed or reloaded with different bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for (name, ds) in &self.datasets {
            hasher.update(name.as_bytes());
            hasher.update(b":");
            hasher.update(ds.fingerprint().as_str().as_bytes());
            hasher.update(b"\n");
        }
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

impl FromIterator<Dataset> for DatasetSet {
    fn from_iter<T: IntoIterator<Item = Dataset>>(iter: T) -> Self {
        let mut set = Self::new();
        for ds in iter {
            set.insert(Arc::new(ds));
        }
        set
    }
}
