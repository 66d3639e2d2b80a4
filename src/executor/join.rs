//! Inner hash join
//!
//! - The right side is indexed by key; left rows drive output order
//! - Null keys never match
//! - Integer and whole-valued decimal keys match each other
//! - Output columns: left columns, then right columns except the key.
//!   Right names that collide with a left name get a `<right>.` prefix.

use std::collections::HashMap;

use crate::dataset::{CellValue, Dataset};
use crate::planner::joined_column_name;

use super::errors::{ExecResult, ExecutionError};
use super::result::Frame;

/// Normalized key so 2 and 2.0 land in the same bucket
fn join_key(cell: &CellValue) -> Option<CellValue> {
    match cell {
        CellValue::Null => None,
        CellValue::Decimal(d) if d.fract() == 0.0 && d.abs() < i64::MAX as f64 => {
            Some(CellValue::Integer(*d as i64))
        }
        other => Some(other.clone()),
    }
}

pub(crate) fn apply_join(left: Frame, right: &Dataset, key: &str) -> ExecResult<Frame> {
    let left_idx = left.index_of(key).ok_or_else(|| {
        ExecutionError::join_key_mismatch(format!("key '{}' is missing on the left side", key))
    })?;
    let right_idx = right.column_index(key).ok_or_else(|| {
        ExecutionError::join_key_mismatch(format!(
            "key '{}' is missing on '{}'",
            key,
            right.name()
        ))
    })?;

    let left_type = left.types[left_idx];
    let right_type = right.columns()[right_idx].column_type;
    if !left_type.is_comparable_with(right_type) {
        return Err(ExecutionError::join_key_mismatch(format!(
            "key '{}' is {} on the left but {} on '{}'",
            key,
            left_type,
            right_type,
            right.name()
        )));
    }

    let mut index: HashMap<CellValue, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(k) = join_key(&row[right_idx]) {
            index.entry(k).or_default().push(i);
        }
    }

    let kept: Vec<usize> = (0..right.columns().len()).filter(|&i| i != right_idx).collect();

    let Frame {
        mut columns,
        mut types,
        rows: left_rows,
    } = left;
    let existing = columns.clone();
    for &i in &kept {
        let def = &right.columns()[i];
        columns.push(joined_column_name(&existing, right.name(), &def.name));
        types.push(def.column_type);
    }

    let mut rows = Vec::new();
    for left_row in left_rows {
        let Some(matches) = join_key(&left_row[left_idx]).and_then(|k| index.get(&k)) else {
            continue;
        };
        for &r in matches {
            let right_row = &right.rows()[r];
            let mut row = Vec::with_capacity(columns.len());
            row.extend(left_row.iter().cloned());
            row.extend(kept.iter().map(|&i| right_row[i].clone()));
            rows.push(row);
        }
    }

    Ok(Frame {
        columns,
        types,
        rows,
    })
}
