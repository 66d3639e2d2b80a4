//! Aggregation
//!
//! - Nulls are skipped by every function; they never count as zero
//! - sum over integers stays integer until it would overflow
//! - avg is always decimal
//! - sum/avg/min/max of no values is null; count of no values is 0
//! - groups appear in the order their key is first seen

use std::collections::HashMap;

use crate::dataset::{CellValue, ColumnType};
use crate::planner::{AggregateFunction, COUNT_ALL};

use super::errors::{ExecResult, ExecutionError};
use super::result::Frame;

#[derive(Debug)]
struct Accumulator {
    function: AggregateFunction,
    count: i64,
    int_sum: Option<i64>,
    float_sum: f64,
    decimal_seen: bool,
    extreme: Option<CellValue>,
}

impl Accumulator {
    fn new(function: AggregateFunction) -> Self {
        Self {
            function,
            count: 0,
            int_sum: Some(0),
            float_sum: 0.0,
            decimal_seen: false,
            extreme: None,
        }
    }

    fn add(&mut self, cell: &CellValue) {
        if cell.is_null() {
            return;
        }
        self.count += 1;
        match self.function {
            AggregateFunction::Sum | AggregateFunction::Avg => {
                match cell {
                    CellValue::Integer(i) => {
                        self.int_sum = self.int_sum.and_then(|s| s.checked_add(*i));
                    }
                    _ => self.decimal_seen = true,
                }
                if let Some(v) = cell.as_f64() {
                    self.float_sum += v;
                }
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let replace = match &self.extreme {
                    None => true,
                    Some(current) => {
                        let ord = cell.total_cmp(current);
                        if self.function == AggregateFunction::Min {
                            ord.is_lt()
                        } else {
                            ord.is_gt()
                        }
                    }
                };
                if replace {
                    self.extreme = Some(cell.clone());
                }
            }
            AggregateFunction::Count => {}
        }
    }

    fn finish(self) -> CellValue {
        match self.function {
            AggregateFunction::Count => CellValue::Integer(self.count),
            _ if self.count == 0 => CellValue::Null,
            AggregateFunction::Sum => match self.int_sum {
                Some(sum) if !self.decimal_seen => CellValue::Integer(sum),
                _ => CellValue::Decimal(self.float_sum),
            },
            AggregateFunction::Avg => CellValue::Decimal(self.float_sum / self.count as f64),
            AggregateFunction::Min | AggregateFunction::Max => {
                self.extreme.unwrap_or(CellValue::Null)
            }
        }
    }
}

fn output_type(function: AggregateFunction, input: Option<ColumnType>) -> ColumnType {
    match (function, input) {
        (AggregateFunction::Count, _) => ColumnType::Integer,
        (AggregateFunction::Avg, _) => ColumnType::Decimal,
        (_, Some(ty)) => ty,
        (_, None) => ColumnType::Integer,
    }
}

fn value_cell<'a>(row: &'a [CellValue], idx: Option<usize>, marker: &'a CellValue) -> &'a CellValue {
    match idx {
        Some(i) => &row[i],
        None => marker,
    }
}

/// Aggregates `frame` into `[group_by?, "<fn>_<column>"]`
pub(crate) fn apply_aggregate(
    frame: Frame,
    column: &str,
    function: AggregateFunction,
    group_by: Option<&str>,
) -> ExecResult<Frame> {
    // None means count(*): every row counts
    let value_idx = if column == COUNT_ALL {
        None
    } else {
        Some(
            frame
                .index_of(column)
                .ok_or_else(|| ExecutionError::unknown_column(column))?,
        )
    };
    let value_type = value_idx.map(|i| frame.types[i]);
    let output_name = function.output_column(column);
    let output = output_type(function, value_type);
    let row_marker = CellValue::Boolean(true);

    match group_by {
        None => {
            let mut acc = Accumulator::new(function);
            for row in &frame.rows {
                acc.add(value_cell(row, value_idx, &row_marker));
            }
            Ok(Frame {
                columns: vec![output_name],
                types: vec![output],
                rows: vec![vec![acc.finish()]],
            })
        }
        Some(group_column) => {
            let group_idx = frame
                .index_of(group_column)
                .ok_or_else(|| ExecutionError::unknown_column(group_column))?;

            let mut positions: HashMap<CellValue, usize> = HashMap::new();
            let mut groups: Vec<(CellValue, Accumulator)> = Vec::new();
            for row in &frame.rows {
                let key = &row[group_idx];
                let pos = match positions.get(key) {
                    Some(&pos) => pos,
                    None => {
                        positions.insert(key.clone(), groups.len());
                        groups.push((key.clone(), Accumulator::new(function)));
                        groups.len() - 1
                    }
                };
                groups[pos].1.add(value_cell(row, value_idx, &row_marker));
            }

            Ok(Frame {
                columns: vec![group_column.to_string(), output_name],
                types: vec![frame.types[group_idx], output],
                rows: groups
                    .into_iter()
                    .map(|(key, acc)| vec![key, acc.finish()])
                    .collect(),
            })
        }
    }
}
