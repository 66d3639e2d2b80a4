//! Plan validation
//!
//! Walks the operations in order while tracking the working column set:
//! joins add right-side columns, an aggregate replaces the set with its
//! output columns, a ratio adds its alias. Every reference is checked
//! against the set as it stands at that step.

use crate::dataset::{CellValue, ColumnType};
use crate::schema::SchemaDescriptor;

use super::ast::{
    joined_column_name, AggregateFunction, Comparator, JoinKind, Operation, QueryPlan, COUNT_ALL,
};
use super::errors::{PlanningError, PlanningResult};

#[derive(Debug, Clone)]
struct WorkingColumn {
    name: String,
    column_type: ColumnType,
}

#[derive(Debug)]
struct WorkingSet {
    columns: Vec<WorkingColumn>,
}

impl WorkingSet {
    fn lookup(&self, name: &str) -> PlanningResult<&WorkingColumn> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| PlanningError::unknown_column(name, &self.names()))
    }

    fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Checks `plan` against `descriptor` without touching any data
pub fn validate(plan: &QueryPlan, descriptor: &SchemaDescriptor) -> PlanningResult<()> {
    if plan.operations.is_empty() {
        return Err(PlanningError::malformed("Plan has no operations"));
    }

    let mut working = dataset_columns(&plan.dataset, descriptor)?;
    let mut aggregated = false;
    let last = plan.operations.len() - 1;

    for (i, op) in plan.operations.iter().enumerate() {
        if aggregated && !matches!(op, Operation::Sort { .. } | Operation::Limit { .. }) {
            return Err(PlanningError::malformed(format!(
                "Only sort and limit may follow an aggregate (found {} at step {})",
                op.name(),
                i + 1
            )));
        }

        match op {
            Operation::Filter {
                column,
                comparator,
                value,
            } => check_filter(&working, column, *comparator, value)?,

            Operation::Aggregate {
                column,
                function,
                group_by,
            } => {
                working = check_aggregate(&working, column, *function, group_by.as_deref())?;
                aggregated = true;
            }

            Operation::Sort { column, .. } => {
                working.lookup(column)?;
            }

            Operation::Limit { n } => {
                if *n == 0 {
                    return Err(PlanningError::malformed("Limit must be at least 1"));
                }
                if i != last {
                    return Err(PlanningError::malformed(
                        "Limit must be the final operation",
                    ));
                }
            }

            Operation::Join {
                left,
                right,
                key,
                kind,
            } => {
                if *kind != JoinKind::Inner {
                    return Err(PlanningError::malformed(format!(
                        "Only inner joins are supported (got {})",
                        kind.as_str()
                    )));
                }
                if left != &plan.dataset {
                    return Err(PlanningError::malformed(format!(
                        "Join left side must be the base dataset '{}' (got '{}')",
                        plan.dataset, left
                    )));
                }
                let right_columns = dataset_columns(right, descriptor)?;
                check_join(&mut working, right, &right_columns, key)?;
            }

            Operation::Ratio {
                numerator,
                denominator,
                alias,
            } => {
                for operand in [numerator, denominator] {
                    let col = working.lookup(operand)?;
                    if !col.column_type.is_numeric() {
                        return Err(PlanningError::type_mismatch(
                            operand.as_str(),
                            format!("ratio operands must be numeric, not {}", col.column_type),
                        ));
                    }
                }
                if alias.trim().is_empty() || working.contains(alias) {
                    return Err(PlanningError::malformed(format!(
                        "Ratio alias '{}' is empty or collides with an existing column",
                        alias
                    )));
                }
                working.columns.push(WorkingColumn {
                    name: alias.clone(),
                    column_type: ColumnType::Decimal,
                });
            }
        }
    }

    Ok(())
}

fn dataset_columns(name: &str, descriptor: &SchemaDescriptor) -> PlanningResult<WorkingSet> {
    let dataset = descriptor.dataset(name).ok_or_else(|| {
        let available: Vec<String> = descriptor.datasets().iter().map(|d| d.name.clone()).collect();
        PlanningError::unknown_dataset(name, &available)
    })?;
    Ok(WorkingSet {
        columns: dataset
            .columns
            .iter()
            .map(|c| WorkingColumn {
                name: c.name.clone(),
                column_type: c.column_type,
            })
            .collect(),
    })
}

fn check_filter(
    working: &WorkingSet,
    column: &str,
    comparator: Comparator,
    value: &serde_json::Value,
) -> PlanningResult<()> {
    let col = working.lookup(column)?;
    let ty = col.column_type;

    if comparator == Comparator::Contains && ty != ColumnType::Text {
        return Err(PlanningError::type_mismatch(
            column,
            format!("'contains' needs a text column, not {}", ty),
        ));
    }
    if comparator.is_ordering() && !ty.is_ordered() {
        return Err(PlanningError::type_mismatch(
            column,
            format!("'{}' cannot order {} values", comparator.as_str(), ty),
        ));
    }
    if CellValue::from_literal(value, ty).is_none() {
        return Err(PlanningError::type_mismatch(
            column,
            format!("value {} is not a valid {}", value, ty),
        ));
    }
    Ok(())
}

fn check_aggregate(
    working: &WorkingSet,
    column: &str,
    function: AggregateFunction,
    group_by: Option<&str>,
) -> PlanningResult<WorkingSet> {
    let output_type = if column == COUNT_ALL {
        if function != AggregateFunction::Count {
            return Err(PlanningError::malformed(format!(
                "'*' is only valid with count, not {}",
                function.as_str()
            )));
        }
        ColumnType::Integer
    } else {
        let ty = working.lookup(column)?.column_type;
        match function {
            AggregateFunction::Sum | AggregateFunction::Avg if !ty.is_numeric() => {
                return Err(PlanningError::type_mismatch(
                    column,
                    format!("{} needs a numeric column, not {}", function.as_str(), ty),
                ));
            }
            AggregateFunction::Min | AggregateFunction::Max if !ty.is_ordered() => {
                return Err(PlanningError::type_mismatch(
                    column,
                    format!("{} cannot order {} values", function.as_str(), ty),
                ));
            }
            AggregateFunction::Count => ColumnType::Integer,
            AggregateFunction::Avg => ColumnType::Decimal,
            _ => ty,
        }
    };

    let mut columns = Vec::with_capacity(2);
    if let Some(g) = group_by {
        columns.push(working.lookup(g)?.clone());
    }
    columns.push(WorkingColumn {
        name: function.output_column(column),
        column_type: output_type,
    });
    Ok(WorkingSet { columns })
}

fn check_join(
    working: &mut WorkingSet,
    right: &str,
    right_columns: &WorkingSet,
    key: &str,
) -> PlanningResult<()> {
    let left_key = working.lookup(key)?.column_type;
    let right_key = right_columns.lookup(key)?.column_type;
    if !left_key.is_comparable_with(right_key) {
        return Err(PlanningError::type_mismatch(
            key,
            format!(
                "join key is {} on the left but {} on '{}'",
                left_key, right_key, right
            ),
        ));
    }

    let existing = working.names();
    for col in right_columns.columns.iter().filter(|c| c.name != key) {
        working.columns.push(WorkingColumn {
            name: joined_column_name(&existing, right, &col.name),
            column_type: col.column_type,
        });
    }
    Ok(())
}
