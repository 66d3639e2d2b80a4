//! Query planner
//!
//! question + descriptor → validated plan.
//!
//! Three independent bounds apply:
//! - transient model failures: `model_retry.max_retries` retries with backoff
//! - unparseable replies: `parse_retries` re-asks with the error fed back
//! - validation failures: fed back once; the second one is returned

use std::sync::Arc;

use crate::llm::{LanguageModel, ModelError};
use crate::observability::{Logger, MetricsRegistry, ObservationScope};
use crate::retry::{RetryError, RetryPolicy};
use crate::schema::SchemaDescriptor;

use super::ast::QueryPlan;
use super::errors::{PlanningError, PlanningResult};
use super::parser::parse_plan;
use super::prompt::build_prompt;
use super::validator::validate;

/// Default number of re-asks after an unparseable reply
pub const DEFAULT_PARSE_RETRIES: u32 = 2;

/// Turns questions into plans through a language model
pub struct QueryPlanner {
    model: Arc<dyn LanguageModel>,
    model_retry: RetryPolicy,
    parse_retries: u32,
    metrics: Arc<MetricsRegistry>,
}

impl QueryPlanner {
    /// Create a planner
    pub fn new(model: Arc<dyn LanguageModel>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            model,
            model_retry: RetryPolicy::default(),
            parse_retries: DEFAULT_PARSE_RETRIES,
            metrics,
        }
    }

    /// Override the transient-failure policy
    pub fn with_model_retry(mut self, policy: RetryPolicy) -> Self {
        self.model_retry = policy;
        self
    }

    /// Override the unparseable-reply bound
    pub fn with_parse_retries(mut self, retries: u32) -> Self {
        self.parse_retries = retries;
        self
    }

    /// Plans `question` against `descriptor`
    pub async fn plan(&self, question: &str, descriptor: &SchemaDescriptor) -> PlanningResult<QueryPlan> {
        let scope = ObservationScope::with_fields("PLAN", &[("question", question)]);

        match self.plan_inner(question, descriptor).await {
            Ok(plan) => {
                self.metrics.increment_plans_generated();
                scope.complete_with_fields(&[("plan", &plan.to_string())]);
                Ok(plan)
            }
            Err(e) => {
                self.metrics.increment_plans_rejected();
                scope.fail(e.code().code(), e.message());
                Err(e)
            }
        }
    }

    async fn plan_inner(&self, question: &str, descriptor: &SchemaDescriptor) -> PlanningResult<QueryPlan> {
        let mut feedback: Option<String> = None;
        let mut parse_failures = 0u32;
        let mut validation_fed_back = false;

        loop {
            let prompt = build_prompt(question, descriptor, feedback.as_deref());
            let reply = self.call_model(&prompt).await?;

            let plan = match parse_plan(&reply, descriptor) {
                Ok(plan) => plan,
                Err(reason) => {
                    parse_failures += 1;
                    if parse_failures > self.parse_retries {
                        return Err(PlanningError::unresolvable(parse_failures, reason));
                    }
                    let attempt = parse_failures.to_string();
                    Logger::warn(
                        "PLAN_UNPARSEABLE",
                        &[("attempt", &attempt), ("reason", &reason)],
                    );
                    feedback = Some(reason);
                    continue;
                }
            };

            match validate(&plan, descriptor) {
                Ok(()) => return Ok(plan),
                Err(e) if !validation_fed_back => {
                    Logger::warn(
                        "PLAN_INVALID",
                        &[("code", e.code().code()), ("reason", e.message())],
                    );
                    validation_fed_back = true;
                    feedback = Some(e.message().to_string());
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_model(&self, prompt: &str) -> PlanningResult<String> {
        let model = &self.model;
        let metrics = &self.metrics;

        self.model_retry
            .run("model_complete", ModelError::is_transient, |attempt| {
                metrics.increment_model_calls();
                if attempt > 0 {
                    metrics.increment_model_retries();
                }
                model.complete(prompt)
            })
            .await
            .map_err(|e| match e {
                RetryError::Exhausted { attempts, last } => PlanningError::service_unavailable(
                    format!("model unavailable after {} attempts: {}", attempts, last),
                ),
                RetryError::Permanent(e) => {
                    PlanningError::service_unavailable(format!("model refused the request: {}", e))
                }
            })
    }
}

impl std::fmt::Debug for QueryPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlanner")
            .field("model_retry", &self.model_retry)
            .field("parse_retries", &self.parse_retries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DatasetSet};
    use crate::llm::ScriptedModel;
    use crate::planner::ast::{AggregateFunction, Operation};
    use crate::planner::errors::PlanningErrorCode;
    use crate::schema::describe;

    const GOOD: &str = r#"{"dataset":"sales","operations":[{"op":"aggregate","column":"sales","function":"sum","group_by":"region"}]}"#;
    const BAD_COLUMN: &str = r#"{"dataset":"sales","operations":[{"op":"sort","column":"revenue"}]}"#;

    fn descriptor() -> SchemaDescriptor {
        describe(&DatasetSet::new().with(Dataset::from_csv("sales", "region,sales\neast,10\n").unwrap()))
    }

    fn planner(model: Arc<ScriptedModel>) -> QueryPlanner {
        QueryPlanner::new(model, Arc::new(MetricsRegistry::new()))
            .with_model_retry(RetryPolicy::immediate(3))
    }

    #[tokio::test]
    async fn test_first_reply_accepted() {
        let model = Arc::new(ScriptedModel::replying([GOOD]));
        let plan = planner(model.clone()).plan("total sales by region", &descriptor()).await.unwrap();
        assert_eq!(
            plan.operations,
            vec![Operation::aggregate("sales", AggregateFunction::Sum, Some("region"))]
        );
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_fed_back() {
        let model = Arc::new(ScriptedModel::replying(["I think you want the sum.", GOOD]));
        planner(model.clone()).plan("q", &descriptor()).await.unwrap();
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("previous reply"));
        assert!(prompts[1].contains("no JSON object found"));
    }

    #[tokio::test]
    async fn test_validation_fed_back_once() {
        let model = Arc::new(ScriptedModel::replying([BAD_COLUMN, BAD_COLUMN, GOOD]));
        let err = planner(model.clone()).plan("q", &descriptor()).await.unwrap_err();
        assert_eq!(err.code(), PlanningErrorCode::UnknownColumn);
        assert_eq!(model.calls(), 2);
        assert!(model.prompts()[1].contains("revenue"));
    }

    #[tokio::test]
    async fn test_transient_failures_retried() {
        let model = Arc::new(ScriptedModel::new([
            Err(ModelError::Timeout("slow".into())),
            Err(ModelError::RateLimited("429".into())),
            Ok(GOOD.to_string()),
        ]));
        let metrics = Arc::new(MetricsRegistry::new());
        let planner = QueryPlanner::new(model.clone(), metrics.clone())
            .with_model_retry(RetryPolicy::immediate(3));
        planner.plan("q", &descriptor()).await.unwrap();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.model_calls, 3);
        assert_eq!(snapshot.model_retries, 2);
        assert_eq!(snapshot.plans_generated, 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let model = Arc::new(ScriptedModel::new([Err(ModelError::Rejected("401".into()))]));
        let err = planner(model.clone()).plan("q", &descriptor()).await.unwrap_err();
        assert_eq!(err.code(), PlanningErrorCode::ServiceUnavailable);
        assert_eq!(model.calls(), 1);
    }
}
