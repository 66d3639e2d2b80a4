//! # Datasets
//!
//! Loading tabular files out of blob storage into typed, fingerprinted,
//! immutable [`Dataset`] values.
//!
//! - Column types are inferred from every non-empty cell
//! - Empty cells are null
//! - The fingerprint is a SHA-256 of the raw bytes; identical bytes give
//!   identical fingerprints
//! - Supported formats: CSV, TSV, JSON arrays of flat records

mod catalog;
mod errors;
mod infer;
mod loader;
mod parser;
mod types;
mod value;

pub use catalog::DatasetCatalog;
pub use errors::{LoadError, LoadResult};
pub use loader::{DatasetLoader, SourceRef};
pub use parser::{parser_for, CsvParser, JsonRecordsParser, ParseError, RawTable, TabularParser};
pub use types::{ColumnDef, Dataset, DatasetSet, Fingerprint};
pub use value::{CellValue, ColumnType};
