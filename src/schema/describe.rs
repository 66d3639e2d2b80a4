//! Descriptor construction
//!
//! Pure and deterministic: datasets in name order, columns in schema
//! order, samples in row order. Same set in, byte-identical text out.

use std::fmt::Write;

use crate::dataset::{CellValue, Dataset, DatasetSet};

use super::types::{ColumnDescriptor, DatasetDescriptor, SchemaDescriptor};

const MAX_SAMPLES: usize = 3;

/// Describes every dataset in `datasets`
pub fn describe(datasets: &DatasetSet) -> SchemaDescriptor {
    let described: Vec<DatasetDescriptor> = datasets.iter().map(|d| describe_dataset(d)).collect();
    let text = render(&described);
    SchemaDescriptor {
        datasets: described,
        fingerprint: datasets.fingerprint(),
        text,
    }
}

fn describe_dataset(dataset: &Dataset) -> DatasetDescriptor {
    let columns = dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(i, def)| ColumnDescriptor {
            name: def.name.clone(),
            column_type: def.column_type,
            numeric_text: def.numeric_text,
            nullable: def.null_count > 0,
            samples: samples(dataset.rows().iter().map(|row| &row[i])),
        })
        .collect();

    DatasetDescriptor {
        name: dataset.name().to_string(),
        row_count: dataset.row_count(),
        fingerprint: dataset.fingerprint().clone(),
        columns,
    }
}

fn samples<'a>(cells: impl Iterator<Item = &'a CellValue>) -> Vec<String> {
    let mut seen: Vec<&CellValue> = Vec::with_capacity(MAX_SAMPLES);
    for cell in cells {
        if cell.is_null() || seen.contains(&cell) {
            continue;
        }
        seen.push(cell);
        if seen.len() == MAX_SAMPLES {
            break;
        }
    }
    seen.into_iter().map(|c| c.to_string()).collect()
}

fn render(datasets: &[DatasetDescriptor]) -> String {
    let mut out = String::new();
    for dataset in datasets {
        // Writing to a String cannot fail
        let _ = writeln!(
            out,
            "Dataset \"{}\" ({} rows)",
            dataset.name, dataset.row_count
        );
        for column in &dataset.columns {
            let _ = write!(out, "  - {}: {}", column.name, column.type_label());
            if column.nullable {
                out.push_str(", nullable");
            }
            if !column.samples.is_empty() {
                let _ = write!(out, "; e.g. {}", column.samples.join(" | "));
            }
            out.push('\n');
        }
    }
    out
}
