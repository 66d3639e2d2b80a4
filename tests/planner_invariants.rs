//! Query planner invariant tests
//!
//! Test Categories:
//! 1. Validation happens before anything runs
//! 2. Unparseable replies are fed back, then give up as unresolvable
//! 3. Validation failures are fed back exactly once
//! 4. Transient model failures are retried, then reported as unavailable

use std::sync::Arc;

use tabquery::dataset::{Dataset, DatasetSet};
use tabquery::llm::{ModelError, ScriptedModel};
use tabquery::observability::MetricsRegistry;
use tabquery::planner::{AggregateFunction, Operation, PlanningErrorCode, QueryPlan, QueryPlanner};
use tabquery::retry::RetryPolicy;
use tabquery::schema::{describe, SchemaDescriptor};

// =============================================================================
// HELPERS
// =============================================================================

const GOOD_PLAN: &str = r#"{"dataset":"sales","operations":[{"op":"aggregate","column":"sales","function":"sum","group_by":"region"}]}"#;
const UNKNOWN_COLUMN_PLAN: &str = r#"{"dataset":"sales","operations":[{"op":"aggregate","column":"revenue","function":"sum"}]}"#;

fn sales_schema() -> SchemaDescriptor {
    describe(&DatasetSet::new().with(
        Dataset::from_csv("sales", "region,sales\neast,10\nwest,20\neast,5\n").unwrap(),
    ))
}

fn planner_for(model: &Arc<ScriptedModel>) -> (QueryPlanner, Arc<MetricsRegistry>) {
    let metrics = Arc::new(MetricsRegistry::new());
    let planner = QueryPlanner::new(model.clone(), Arc::clone(&metrics))
        .with_model_retry(RetryPolicy::immediate(2));
    (planner, metrics)
}

// =============================================================================
// HAPPY PATH
// =============================================================================

#[tokio::test]
async fn test_plan_from_fenced_reply() {
    let reply = format!("Here is the plan:\n```json\n{}\n```", GOOD_PLAN);
    let model = Arc::new(ScriptedModel::replying([reply]));
    let (planner, metrics) = planner_for(&model);

    let plan = planner.plan("total sales by region", &sales_schema()).await.unwrap();
    assert_eq!(
        plan,
        QueryPlan::new(
            "sales",
            vec![Operation::aggregate("sales", AggregateFunction::Sum, Some("region"))]
        )
    );
    assert_eq!(model.calls(), 1);
    assert_eq!(metrics.snapshot().plans_generated, 1);
}

/// The prompt carries the schema text and the question verbatim.
#[tokio::test]
async fn test_prompt_contains_schema_and_question() {
    let model = Arc::new(ScriptedModel::replying([GOOD_PLAN]));
    let (planner, _) = planner_for(&model);
    let schema = sales_schema();

    planner.plan("total sales by region", &schema).await.unwrap();
    let prompt = &model.prompts()[0];
    assert!(prompt.contains(schema.text()));
    assert!(prompt.contains("total sales by region"));
}

// =============================================================================
// VALIDATION BEFORE EXECUTION
// =============================================================================

/// A plan naming a column that does not exist is rejected with UnknownColumn,
/// after one corrective round trip.
#[tokio::test]
async fn test_unknown_column_rejected() {
    let model = Arc::new(ScriptedModel::replying([UNKNOWN_COLUMN_PLAN, UNKNOWN_COLUMN_PLAN]));
    let (planner, metrics) = planner_for(&model);

    let err = planner.plan("total revenue", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::UnknownColumn);
    assert_eq!(err.column(), Some("revenue"));
    assert!(err.is_validation());
    assert_eq!(model.calls(), 2);
    assert_eq!(metrics.snapshot().plans_rejected, 1);
}

/// The validation error is fed back once; a corrected reply is accepted.
#[tokio::test]
async fn test_validation_feedback_then_success() {
    let model = Arc::new(ScriptedModel::replying([UNKNOWN_COLUMN_PLAN, GOOD_PLAN]));
    let (planner, _) = planner_for(&model);

    planner.plan("total sales by region", &sales_schema()).await.unwrap();
    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("revenue"));
    assert!(prompts[1].contains("Column 'revenue' does not exist"));
}

/// Filtering an integer column with a word is a type mismatch.
#[tokio::test]
async fn test_type_mismatch_rejected() {
    let bad = r#"{"dataset":"sales","operations":[{"op":"filter","column":"sales","comparator":"gt","value":"lots"}]}"#;
    let model = Arc::new(ScriptedModel::replying([bad, bad]));
    let (planner, _) = planner_for(&model);

    let err = planner.plan("big sales", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::TypeMismatch);
}

/// Only inner joins are executable; anything else is rejected up front.
#[tokio::test]
async fn test_outer_join_rejected() {
    let schema = describe(
        &DatasetSet::new()
            .with(Dataset::from_csv("left", "id,a\n1,x\n").unwrap())
            .with(Dataset::from_csv("right", "id,b\n1,y\n").unwrap()),
    );
    let outer = r#"{"dataset":"left","operations":[{"op":"join","left":"left","right":"right","key":"id","kind":"outer"}]}"#;
    let model = Arc::new(ScriptedModel::replying([outer, outer]));
    let (planner, _) = planner_for(&model);

    let err = planner.plan("everything", &schema).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::MalformedPlan);
    assert!(err.message().contains("inner"));
}

// =============================================================================
// PARSE RETRIES
// =============================================================================

/// Prose replies are fed back until the parse budget runs out.
#[tokio::test]
async fn test_parse_retries_exhaust_to_unresolvable() {
    let model = Arc::new(ScriptedModel::replying([
        "I think the answer is 15.",
        "Sorry, 15.",
        "15",
    ]));
    let (planner, _) = planner_for(&model);

    let err = planner.plan("total sales", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::Unresolvable);
    assert_eq!(model.calls(), 3);

    let prompts = model.prompts();
    assert!(prompts[1].contains("Your previous reply was not usable"));
    assert!(prompts[1].contains("no JSON object found"));
}

#[tokio::test]
async fn test_parse_retry_recovers() {
    let model = Arc::new(ScriptedModel::replying(["{\"dataset\": ", GOOD_PLAN]));
    let (planner, _) = planner_for(&model);

    planner.plan("total sales by region", &sales_schema()).await.unwrap();
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_parse_retry_budget_is_configurable() {
    let model = Arc::new(ScriptedModel::replying(["nope", GOOD_PLAN]));
    let metrics = Arc::new(MetricsRegistry::new());
    let planner = QueryPlanner::new(model.clone(), metrics).with_parse_retries(0);

    let err = planner.plan("total", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::Unresolvable);
    assert_eq!(model.calls(), 1);
}

// =============================================================================
// MODEL FAILURES
// =============================================================================

/// Transient failures are retried with the model retry budget, then surface
/// as ServiceUnavailable.
#[tokio::test]
async fn test_transient_exhaustion_is_service_unavailable() {
    let model = Arc::new(ScriptedModel::new([
        Err(ModelError::Unavailable("503".into())),
        Err(ModelError::Timeout("slow".into())),
        Err(ModelError::RateLimited("429".into())),
    ]));
    let (planner, metrics) = planner_for(&model);

    let err = planner.plan("total", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::ServiceUnavailable);
    assert_eq!(model.calls(), 3);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.model_calls, 3);
    assert_eq!(snapshot.model_retries, 2);
}

#[tokio::test]
async fn test_transient_then_success() {
    let model = Arc::new(ScriptedModel::new([
        Err(ModelError::RateLimited("429".into())),
        Ok(GOOD_PLAN.to_string()),
    ]));
    let (planner, _) = planner_for(&model);

    planner.plan("total sales by region", &sales_schema()).await.unwrap();
    assert_eq!(model.calls(), 2);
}

/// A rejected request is not retried.
#[tokio::test]
async fn test_permanent_failure_not_retried() {
    let model = Arc::new(ScriptedModel::new([
        Err(ModelError::Rejected("401".into())),
        Ok(GOOD_PLAN.to_string()),
    ]));
    let (planner, _) = planner_for(&model);

    let err = planner.plan("total", &sales_schema()).await.unwrap_err();
    assert_eq!(err.code(), PlanningErrorCode::ServiceUnavailable);
    assert_eq!(model.calls(), 1);
}
