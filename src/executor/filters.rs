//! Row filtering
//!
//! - Null cells never match, whatever the comparator
//! - Integer and decimal compare by numeric value
//! - `contains` is a case-insensitive substring test on text

use std::cmp::Ordering;

use crate::dataset::{CellValue, ColumnType};
use crate::planner::Comparator;

use super::errors::{ExecResult, ExecutionError};
use super::result::Frame;

/// Keeps the rows of `frame` whose `column` satisfies the comparison
pub(crate) fn apply_filter(
    frame: Frame,
    column: &str,
    comparator: Comparator,
    value: &serde_json::Value,
) -> ExecResult<Frame> {
    let idx = frame
        .index_of(column)
        .ok_or_else(|| ExecutionError::unknown_column(column))?;
    let column_type = frame.types[idx];

    if comparator == Comparator::Contains && column_type != ColumnType::Text {
        return Err(ExecutionError::type_coercion(column, value, column_type));
    }
    let literal = CellValue::from_literal(value, column_type)
        .ok_or_else(|| ExecutionError::type_coercion(column, value, column_type))?;
    let needle = match (&literal, comparator) {
        (CellValue::Text(s), Comparator::Contains) => Some(s.to_lowercase()),
        _ => None,
    };

    let Frame {
        columns,
        types,
        rows,
    } = frame;
    let rows = rows
        .into_iter()
        .filter(|row| matches(&row[idx], comparator, &literal, needle.as_deref()))
        .collect();

    Ok(Frame {
        columns,
        types,
        rows,
    })
}

fn matches(cell: &CellValue, comparator: Comparator, literal: &CellValue, needle: Option<&str>) -> bool {
    if cell.is_null() {
        return false;
    }
    if comparator == Comparator::Contains {
        return match (cell.as_text(), needle) {
            (Some(text), Some(needle)) => text.to_lowercase().contains(needle),
            _ => false,
        };
    }

    let Some(ordering) = compare(cell, literal) else {
        return false;
    };
    match comparator {
        Comparator::Eq => ordering == Ordering::Equal,
        Comparator::Ne => ordering != Ordering::Equal,
        Comparator::Gt => ordering == Ordering::Greater,
        Comparator::Gte => ordering != Ordering::Less,
        Comparator::Lt => ordering == Ordering::Less,
        Comparator::Lte => ordering != Ordering::Greater,
        Comparator::Contains => false,
    }
}

/// Ordering of two non-null cells of comparable types
pub(crate) fn compare(a: &CellValue, b: &CellValue) -> Option<Ordering> {
    match (a, b) {
        (CellValue::Integer(x), CellValue::Integer(y)) => Some(x.cmp(y)),
        (CellValue::Text(x), CellValue::Text(y)) => Some(x.cmp(y)),
        (CellValue::Date(x), CellValue::Date(y)) => Some(x.cmp(y)),
        (CellValue::Boolean(x), CellValue::Boolean(y)) => Some(x.cmp(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}
