//! Plan executor
//!
//! Applies a validated plan to an immutable dataset snapshot. No I/O, no
//! suspension, no shared state: the same plan over the same datasets
//! always yields the same result.

use std::collections::BTreeMap;

use crate::dataset::{CellValue, ColumnType, Dataset, DatasetSet, Fingerprint};
use crate::planner::{JoinKind, Operation, QueryPlan};

use super::aggregate::apply_aggregate;
use super::errors::{ExecResult, ExecutionError};
use super::filters::apply_filter;
use super::join::apply_join;
use super::result::{CacheStatus, ExecutionResult, Frame, Provenance, ResultBody};
use super::sorter::apply_sort;

/// Runs query plans
pub struct PlanExecutor;

impl PlanExecutor {
    /// Executes `plan` against `datasets`, operations strictly in order
    pub fn execute(plan: &QueryPlan, datasets: &DatasetSet) -> ExecResult<ExecutionResult> {
        let base = lookup(datasets, &plan.dataset)?;
        let mut read = BTreeMap::new();
        read.insert(base.name().to_string(), base.fingerprint().clone());

        let mut frame = frame_of(base);
        let mut scalar = false;

        for (step, op) in plan.operations.iter().enumerate() {
            frame = Self::apply(frame, op, datasets, &mut read, &mut scalar)
                .map_err(|e| e.at_step(step))?;
        }

        let body = if scalar {
            let value = frame
                .rows
                .first()
                .and_then(|row| row.first())
                .cloned()
                .unwrap_or(CellValue::Null);
            ResultBody::Scalar { value }
        } else {
            ResultBody::Table {
                columns: frame.columns,
                rows: frame.rows,
            }
        };

        Ok(ExecutionResult {
            body,
            provenance: Provenance {
                plan: plan.clone(),
                fingerprint: datasets.fingerprint(),
                datasets: read,
                cache: CacheStatus::Miss,
            },
            summary: None,
        })
    }

    fn apply(
        frame: Frame,
        op: &Operation,
        datasets: &DatasetSet,
        read: &mut BTreeMap<String, Fingerprint>,
        scalar: &mut bool,
    ) -> ExecResult<Frame> {
        match op {
            Operation::Filter {
                column,
                comparator,
                value,
            } => apply_filter(frame, column, *comparator, value),

            Operation::Aggregate {
                column,
                function,
                group_by,
            } => {
                *scalar = group_by.is_none();
                apply_aggregate(frame, column, *function, group_by.as_deref())
            }

            Operation::Sort { column, direction } => apply_sort(frame, column, *direction),

            Operation::Limit { n } => {
                let mut frame = frame;
                frame.rows.truncate(*n);
                Ok(frame)
            }

            Operation::Join {
                right, key, kind, ..
            } => {
                if *kind != JoinKind::Inner {
                    return Err(ExecutionError::join_key_mismatch(format!(
                        "{} joins are not supported",
                        kind.as_str()
                    )));
                }
                let right = lookup(datasets, right)?;
                read.insert(right.name().to_string(), right.fingerprint().clone());
                apply_join(frame, right, key)
            }

            Operation::Ratio {
                numerator,
                denominator,
                alias,
            } => apply_ratio(frame, numerator, denominator, alias),
        }
    }
}

fn lookup<'a>(datasets: &'a DatasetSet, name: &str) -> ExecResult<&'a Dataset> {
    datasets
        .get(name)
        .map(|d| d.as_ref())
        .ok_or_else(|| ExecutionError::unknown_dataset(name))
}

fn frame_of(dataset: &Dataset) -> Frame {
    Frame {
        columns: dataset.columns().iter().map(|c| c.name.clone()).collect(),
        types: dataset.columns().iter().map(|c| c.column_type).collect(),
        rows: dataset.rows().to_vec(),
    }
}

/// Appends `alias = numerator / denominator` as a decimal column
fn apply_ratio(mut frame: Frame, numerator: &str, denominator: &str, alias: &str) -> ExecResult<Frame> {
    let num = frame
        .index_of(numerator)
        .ok_or_else(|| ExecutionError::unknown_column(numerator))?;
    let den = frame
        .index_of(denominator)
        .ok_or_else(|| ExecutionError::unknown_column(denominator))?;

    for row in frame.rows.iter_mut() {
        let value = match (row[num].as_f64(), row[den].as_f64()) {
            (Some(_), Some(d)) if d == 0.0 => {
                return Err(ExecutionError::division_by_zero(numerator, denominator));
            }
            (Some(n), Some(d)) => CellValue::Decimal(n / d),
            _ => CellValue::Null,
        };
        row.push(value);
    }
    frame.columns.push(alias.to_string());
    frame.types.push(ColumnType::Decimal);
    Ok(frame)
}
