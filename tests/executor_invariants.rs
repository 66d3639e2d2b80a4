//! Plan executor invariant tests
//!
//! Test Categories:
//! 1. Purity: same plan, same data, same result
//! 2. Null handling in aggregates
//! 3. Joins
//! 4. Execution-time failures

use tabquery::dataset::{CellValue, Dataset, DatasetSet};
use tabquery::executor::{ExecutionErrorCode, PlanExecutor, ResultBody};
use tabquery::planner::{AggregateFunction, Comparator, Operation, QueryPlan, SortDirection};

use serde_json::json;

// =============================================================================
// HELPERS
// =============================================================================

fn sales() -> DatasetSet {
    DatasetSet::new().with(
        Dataset::from_csv("sales", "region,sales\neast,10\nwest,20\neast,5\n").unwrap(),
    )
}

fn readings() -> DatasetSet {
    DatasetSet::new().with(Dataset::from_csv("readings", "id,v\n1,5\n2,\n3,3\n").unwrap())
}

fn aggregate_readings(function: AggregateFunction) -> CellValue {
    let plan = QueryPlan::new("readings", vec![Operation::aggregate("v", function, None)]);
    let result = PlanExecutor::execute(&plan, &readings()).unwrap();
    result.scalar().cloned().unwrap()
}

// =============================================================================
// PURITY
// =============================================================================

/// Executing the same plan twice over the same snapshot yields equal results.
#[test]
fn test_execute_is_pure() {
    let data = sales();
    let plan = QueryPlan::new(
        "sales",
        vec![
            Operation::filter("sales", Comparator::Gt, json!(4)),
            Operation::sort("sales", SortDirection::Desc),
            Operation::limit(2),
        ],
    );

    let first = PlanExecutor::execute(&plan, &data).unwrap();
    let second = PlanExecutor::execute(&plan, &data).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.column_values("sales").unwrap(),
        vec![&CellValue::Integer(20), &CellValue::Integer(10)]
    );
}

/// Operations apply in plan order.
#[test]
fn test_operations_never_reorder() {
    let data = sales();
    let limit_then_sort = QueryPlan::new(
        "sales",
        vec![Operation::limit(1), Operation::sort("sales", SortDirection::Desc)],
    );
    let sort_then_limit = QueryPlan::new(
        "sales",
        vec![Operation::sort("sales", SortDirection::Desc), Operation::limit(1)],
    );

    let a = PlanExecutor::execute(&limit_then_sort, &data).unwrap();
    let b = PlanExecutor::execute(&sort_then_limit, &data).unwrap();
    assert_eq!(a.column_values("sales").unwrap(), vec![&CellValue::Integer(10)]);
    assert_eq!(b.column_values("sales").unwrap(), vec![&CellValue::Integer(20)]);
}

// =============================================================================
// NULLS IN AGGREGATES
// =============================================================================

/// sum over [5, null, 3] is 8: the null is skipped, not treated as zero.
#[test]
fn test_sum_skips_nulls() {
    assert_eq!(aggregate_readings(AggregateFunction::Sum), CellValue::Integer(8));
}

/// avg over [5, null, 3] is 4, not 8/3.
#[test]
fn test_avg_skips_nulls() {
    assert_eq!(aggregate_readings(AggregateFunction::Avg), CellValue::Decimal(4.0));
}

#[test]
fn test_count_skips_nulls() {
    assert_eq!(aggregate_readings(AggregateFunction::Count), CellValue::Integer(2));
}

/// Aggregating zero rows: count is 0, everything else is null.
#[test]
fn test_aggregate_of_nothing() {
    let data = readings();
    let empty = |function| {
        let plan = QueryPlan::new(
            "readings",
            vec![
                Operation::filter("id", Comparator::Gt, json!(100)),
                Operation::aggregate("v", function, None),
            ],
        );
        PlanExecutor::execute(&plan, &data)
            .unwrap()
            .scalar()
            .cloned()
            .unwrap()
    };
    assert_eq!(empty(AggregateFunction::Count), CellValue::Integer(0));
    assert_eq!(empty(AggregateFunction::Sum), CellValue::Null);
    assert_eq!(empty(AggregateFunction::Max), CellValue::Null);
}

/// Grouped sum returns one row per group in first-appearance order.
#[test]
fn test_grouped_sum() {
    let plan = QueryPlan::new(
        "sales",
        vec![Operation::aggregate("sales", AggregateFunction::Sum, Some("region"))],
    );
    let result = PlanExecutor::execute(&plan, &sales()).unwrap();

    assert_eq!(result.columns(), ["region", "sum_sales"]);
    assert_eq!(
        result.rows(),
        [
            vec![CellValue::Text("east".into()), CellValue::Integer(15)],
            vec![CellValue::Text("west".into()), CellValue::Integer(20)],
        ]
    );
}

// =============================================================================
// JOINS
// =============================================================================

/// Joining ids [1,2,3] with [2,3,4] keeps exactly {2,3}.
#[test]
fn test_inner_join_keeps_matching_keys() {
    let data = DatasetSet::new()
        .with(Dataset::from_csv("left", "id,a\n1,x\n2,y\n3,z\n").unwrap())
        .with(Dataset::from_csv("right", "id,b\n2,p\n3,q\n4,r\n").unwrap());
    let plan = QueryPlan::new("left", vec![Operation::join("left", "right", "id")]);

    let result = PlanExecutor::execute(&plan, &data).unwrap();
    let mut ids: Vec<CellValue> = result
        .column_values("id")
        .unwrap()
        .into_iter()
        .cloned()
        .collect();
    ids.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(ids, vec![CellValue::Integer(2), CellValue::Integer(3)]);
    assert_eq!(result.provenance.datasets.len(), 2);
}

// =============================================================================
// EXECUTION FAILURES
// =============================================================================

#[test]
fn test_ratio_division_by_zero() {
    let data = DatasetSet::new().with(Dataset::from_csv("t", "a,b\n4,2\n1,0\n").unwrap());
    let plan = QueryPlan::new("t", vec![Operation::ratio("a", "b", "a_per_b")]);

    let err = PlanExecutor::execute(&plan, &data).unwrap_err();
    assert_eq!(err.code(), ExecutionErrorCode::DivisionByZero);
    assert_eq!(err.step(), Some(0));
}

#[test]
fn test_ratio_appends_decimal_column() {
    let data = DatasetSet::new().with(Dataset::from_csv("t", "a,b\n3,2\n").unwrap());
    let plan = QueryPlan::new("t", vec![Operation::ratio("a", "b", "a_per_b")]);

    let result = PlanExecutor::execute(&plan, &data).unwrap();
    assert_eq!(result.columns(), ["a", "b", "a_per_b"]);
    assert_eq!(result.rows()[0][2], CellValue::Decimal(1.5));
}

#[test]
fn test_unknown_dataset_at_execution() {
    let plan = QueryPlan::new("missing", vec![Operation::limit(1)]);
    let err = PlanExecutor::execute(&plan, &sales()).unwrap_err();
    assert_eq!(err.code(), ExecutionErrorCode::UnknownDataset);
}

#[test]
fn test_count_all_is_scalar() {
    let plan = QueryPlan::new(
        "sales",
        vec![Operation::aggregate("*", AggregateFunction::Count, None)],
    );
    let result = PlanExecutor::execute(&plan, &sales()).unwrap();
    assert_eq!(
        result.body,
        ResultBody::Scalar {
            value: CellValue::Integer(3)
        }
    );
}
