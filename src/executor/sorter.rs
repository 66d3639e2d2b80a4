//! Stable sorting
//!
//! Ascending puts nulls first; descending is the exact reverse ordering,
//! with ties kept in input order either way.

use crate::planner::SortDirection;

use super::errors::{ExecResult, ExecutionError};
use super::result::Frame;

pub(crate) fn apply_sort(mut frame: Frame, column: &str, direction: SortDirection) -> ExecResult<Frame> {
    let idx = frame
        .index_of(column)
        .ok_or_else(|| ExecutionError::unknown_column(column))?;

    frame.rows.sort_by(|a, b| {
        let ordering = a[idx].total_cmp(&b[idx]);
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, ColumnType};

    fn frame() -> Frame {
        Frame {
            columns: vec!["id".into(), "v".into()],
            types: vec![ColumnType::Integer, ColumnType::Decimal],
            rows: vec![
                vec![1i64.into(), 2.5.into()],
                vec![2i64.into(), CellValue::Null],
                vec![3i64.into(), 1.0.into()],
                vec![4i64.into(), 2.5.into()],
            ],
        }
    }

    fn ids(f: &Frame) -> Vec<i64> {
        f.rows
            .iter()
            .map(|r| match r[0] {
                CellValue::Integer(i) => i,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_ascending_nulls_first_stable() {
        let f = apply_sort(frame(), "v", SortDirection::Asc).unwrap();
        assert_eq!(ids(&f), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_descending_stable() {
        let f = apply_sort(frame(), "v", SortDirection::Desc).unwrap();
        assert_eq!(ids(&f), vec![1, 4, 3, 2]);
    }
}
