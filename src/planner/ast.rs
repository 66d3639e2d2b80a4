//! Query plan structures
//!
//! A plan is what the model is asked to produce: a base dataset and an
//! ordered list of operations. It serializes as JSON with an `"op"` tag:
//!
//! ```json
//! {"dataset": "sales",
//!  "operations": [{"op": "aggregate", "column": "sales", "function": "sum", "group_by": "region"}]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring match on text
    Contains,
}

impl Comparator {
    /// Returns true for `gt gte lt lte`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::Contains => "contains",
        }
    }
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    /// Name of the column an aggregate produces: `sum_sales`, `count_all`
    pub fn output_column(&self, column: &str) -> String {
        if column == COUNT_ALL {
            format!("{}_all", self.as_str())
        } else {
            format!("{}_{}", self.as_str(), column)
        }
    }
}

/// The `count(*)` column marker
pub const COUNT_ALL: &str = "*";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

/// Join kind; only `inner` executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "inner",
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Outer => "outer",
        }
    }
}

/// One step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Filter {
        column: String,
        comparator: Comparator,
        value: serde_json::Value,
    },
    Aggregate {
        column: String,
        function: AggregateFunction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_by: Option<String>,
    },
    Sort {
        column: String,
        #[serde(default)]
        direction: SortDirection,
    },
    Limit {
        n: usize,
    },
    Join {
        left: String,
        right: String,
        key: String,
        #[serde(default)]
        kind: JoinKind,
    },
    /// `alias = numerator / denominator`
    Ratio {
        numerator: String,
        denominator: String,
        alias: String,
    },
}

impl Operation {
    pub fn filter(column: impl Into<String>, comparator: Comparator, value: serde_json::Value) -> Self {
        Operation::Filter {
            column: column.into(),
            comparator,
            value,
        }
    }

    pub fn aggregate(column: impl Into<String>, function: AggregateFunction, group_by: Option<&str>) -> Self {
        Operation::Aggregate {
            column: column.into(),
            function,
            group_by: group_by.map(str::to_string),
        }
    }

    pub fn sort(column: impl Into<String>, direction: SortDirection) -> Self {
        Operation::Sort {
            column: column.into(),
            direction,
        }
    }

    pub fn limit(n: usize) -> Self {
        Operation::Limit { n }
    }

    pub fn join(left: impl Into<String>, right: impl Into<String>, key: impl Into<String>) -> Self {
        Operation::Join {
            left: left.into(),
            right: right.into(),
            key: key.into(),
            kind: JoinKind::Inner,
        }
    }

    pub fn ratio(numerator: impl Into<String>, denominator: impl Into<String>, alias: impl Into<String>) -> Self {
        Operation::Ratio {
            numerator: numerator.into(),
            denominator: denominator.into(),
            alias: alias.into(),
        }
    }

    /// The `op` tag
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Filter { .. } => "filter",
            Operation::Aggregate { .. } => "aggregate",
            Operation::Sort { .. } => "sort",
            Operation::Limit { .. } => "limit",
            Operation::Join { .. } => "join",
            Operation::Ratio { .. } => "ratio",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Filter {
                column,
                comparator,
                value,
            } => write!(f, "filter({} {} {})", column, comparator.as_str(), value),
            Operation::Aggregate {
                column,
                function,
                group_by: Some(g),
            } => write!(f, "aggregate({}({}) by {})", function.as_str(), column, g),
            Operation::Aggregate {
                column, function, ..
            } => write!(f, "aggregate({}({}))", function.as_str(), column),
            Operation::Sort { column, direction } => {
                let dir = match direction {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                };
                write!(f, "sort({} {})", column, dir)
            }
            Operation::Limit { n } => write!(f, "limit({})", n),
            Operation::Join {
                left,
                right,
                key,
                kind,
            } => write!(f, "join({} {} {} on {})", left, kind.as_str(), right, key),
            Operation::Ratio {
                numerator,
                denominator,
                alias,
            } => write!(f, "ratio({} = {} / {})", alias, numerator, denominator),
        }
    }
}

/// A complete plan against one base dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub dataset: String,
    pub operations: Vec<Operation>,
}

impl QueryPlan {
    pub fn new(dataset: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            dataset: dataset.into(),
            operations,
        }
    }

    /// Every dataset the plan reads: the base plus join targets
    pub fn datasets(&self) -> Vec<&str> {
        let mut names = vec![self.dataset.as_str()];
        for op in &self.operations {
            if let Operation::Join { right, .. } = op {
                if !names.contains(&right.as_str()) {
                    names.push(right.as_str());
                }
            }
        }
        names
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dataset)?;
        for op in &self.operations {
            write!(f, " | {}", op)?;
        }
        Ok(())
    }
}

/// Output name for a right-side join column that collides with `existing`
pub fn joined_column_name(existing: &[String], right: &str, column: &str) -> String {
    if existing.iter().any(|c| c == column) {
        format!("{}.{}", right, column)
    } else {
        column.to_string()
    }
}
