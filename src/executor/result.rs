//! Result types for plan execution

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::{CellValue, ColumnType, Fingerprint};
use crate::planner::QueryPlan;

/// How the cache was involved in producing a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Computed for this request
    Miss,
    /// Served from a stored entry
    Hit,
    /// Joined another request's in-flight computation
    Shared,
    /// Computed outside the cache (stale fingerprint)
    Bypassed,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Miss => "miss",
            CacheStatus::Hit => "hit",
            CacheStatus::Shared => "shared",
            CacheStatus::Bypassed => "bypassed",
        }
    }
}

/// Result payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultBody {
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
    /// Ungrouped aggregate
    Scalar { value: CellValue },
}

/// Where a result came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provenance {
    pub plan: QueryPlan,
    /// Combined fingerprint of the dataset set the plan ran against
    pub fingerprint: Fingerprint,
    /// Fingerprint of every dataset the plan read
    pub datasets: BTreeMap<String, Fingerprint>,
    pub cache: CacheStatus,
}

/// Model-written summary of a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Written(String),
    /// Requested but the model could not produce it
    Unavailable,
}

/// Immutable output of one plan execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub body: ResultBody,
    pub provenance: Provenance,
    /// Attached before the result is cached, so hits reuse it
    #[serde(skip)]
    pub summary: Option<Summary>,
}

impl ExecutionResult {
    /// Copy of this result reporting `status`
    pub fn with_cache_status(&self, status: CacheStatus) -> Self {
        let mut result = self.clone();
        result.provenance.cache = status;
        result
    }

    pub fn with_summary(mut self, summary: Summary) -> Self {
        self.summary = Some(summary);
        self
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.provenance.cache
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.provenance.plan
    }

    /// Column names; a scalar has none
    pub fn columns(&self) -> &[String] {
        match &self.body {
            ResultBody::Table { columns, .. } => columns,
            ResultBody::Scalar { .. } => &[],
        }
    }

    /// Table rows; a scalar has none
    pub fn rows(&self) -> &[Vec<CellValue>] {
        match &self.body {
            ResultBody::Table { rows, .. } => rows,
            ResultBody::Scalar { .. } => &[],
        }
    }

    pub fn scalar(&self) -> Option<&CellValue> {
        match &self.body {
            ResultBody::Scalar { value } => Some(value),
            ResultBody::Table { .. } => None,
        }
    }

    /// Values of `column`, top to bottom
    pub fn column_values(&self, column: &str) -> Option<Vec<&CellValue>> {
        let idx = self.columns().iter().position(|c| c == column)?;
        Some(self.rows().iter().map(|r| &r[idx]).collect())
    }
}

/// Intermediate table threaded through the operations
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Frame {
    pub columns: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Frame {
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(body: ResultBody) -> ExecutionResult {
        ExecutionResult {
            body,
            provenance: Provenance {
                plan: QueryPlan::new("sales", vec![]),
                fingerprint: Fingerprint::of_bytes(b"x"),
                datasets: BTreeMap::new(),
                cache: CacheStatus::Miss,
            },
            summary: None,
        }
    }

    #[test]
    fn test_table_accessors() {
        let r = result(ResultBody::Table {
            columns: vec!["region".into(), "sum_sales".into()],
            rows: vec![vec!["east".into(), 15i64.into()]],
        });
        assert_eq!(r.column_values("sum_sales"), Some(vec![&CellValue::Integer(15)]));
        assert!(r.scalar().is_none());
        assert!(r.column_values("missing").is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let r = result(ResultBody::Scalar { value: CellValue::Integer(8) })
            .with_cache_status(CacheStatus::Shared);
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["body"], json!({"kind": "scalar", "value": 8}));
        assert_eq!(value["provenance"]["cache"], "shared");
        assert_eq!(value["provenance"]["plan"]["dataset"], "sales");
    }
}
