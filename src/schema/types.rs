//! Schema descriptor types
//!
//! A descriptor is a read-only projection of a `DatasetSet`. It is rebuilt
//! whenever the set changes and never persisted.

use serde::Serialize;

use crate::dataset::{ColumnType, Fingerprint};

/// One column as the planner sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    /// Digits-only text that must be compared as text
    pub numeric_text: bool,
    pub nullable: bool,
    /// Up to three distinct values, first-seen order
    pub samples: Vec<String>,
}

impl ColumnDescriptor {
    /// Unambiguous type label used in prompt text
    pub fn type_label(&self) -> &'static str {
        match self.column_type {
            ColumnType::Integer => "integer (whole numbers)",
            ColumnType::Decimal => "decimal",
            ColumnType::Text if self.numeric_text => {
                "text (digits only; compare as text, never as a number)"
            }
            ColumnType::Text => "text",
            ColumnType::Date => "date (YYYY-MM-DD)",
            ColumnType::Boolean => "boolean (true/false)",
        }
    }
}

/// One dataset's structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDescriptor {
    pub name: String,
    pub row_count: usize,
    pub fingerprint: Fingerprint,
    pub columns: Vec<ColumnDescriptor>,
}

impl DatasetDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Structure of a whole dataset set plus its rendered prompt text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    pub(super) datasets: Vec<DatasetDescriptor>,
    pub(super) fingerprint: Fingerprint,
    pub(super) text: String,
}

impl SchemaDescriptor {
    /// Datasets in name order
    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetDescriptor> {
        self.datasets.iter().find(|d| d.name == name)
    }

    /// Type of `dataset.column`, if both exist
    pub fn column_type(&self, dataset: &str, column: &str) -> Option<ColumnType> {
        self.dataset(dataset)
            .and_then(|d| d.column(column))
            .map(|c| c.column_type)
    }

    /// Combined fingerprint of the described set
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Rendered description for prompts
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The only dataset, when there is exactly one
    pub fn sole_dataset(&self) -> Option<&DatasetDescriptor> {
        match self.datasets.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}
