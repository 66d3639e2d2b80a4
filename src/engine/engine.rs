//! Query engine
//!
//! Wires the pipeline together:
//!
//! ```text
//! load → catalog ─┐
//!                 ├→ snapshot → cache ─(miss)→ describe → plan → execute
//! ask ────────────┘
//! ```
//!
//! A reload swaps the catalog entry and retires every cache entry computed
//! from another dataset set, under one async lock, so reloads of the same
//! or different datasets never interleave. The narrative is written inside
//! the cached computation, so hits and shared answers reuse it.

use std::sync::Arc;

use futures_util::future::join_all;
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::cache::{CacheStats, ResponseCache};
use crate::dataset::{Dataset, DatasetCatalog, DatasetLoader, DatasetSet, SourceRef};
use crate::executor::{CacheStatus, ExecutionResult, PlanExecutor, Summary};
use crate::llm::LanguageModel;
use crate::observability::{Logger, MetricsRegistry, MetricsSnapshot, ObservationScope};
use crate::planner::{QueryPlanner, DEFAULT_PARSE_RETRIES};
use crate::retry::RetryPolicy;
use crate::schema::{describe, SchemaDescriptor};

use super::answer::Answer;
use super::errors::{EngineError, EngineResult};
use super::narrative::{column_text, Narrator, SentimentAnalyzer, SentimentReport};

/// Tunables for a `QueryEngine`
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub blob_retry: RetryPolicy,
    pub model_retry: RetryPolicy,
    pub parse_retries: u32,
    /// Ask the model for a summary of each answer
    pub narrative: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            blob_retry: RetryPolicy::default(),
            model_retry: RetryPolicy::default(),
            parse_retries: DEFAULT_PARSE_RETRIES,
            narrative: false,
        }
    }
}

/// Natural-language questions over loaded datasets
pub struct QueryEngine {
    loader: DatasetLoader,
    catalog: DatasetCatalog,
    planner: Arc<QueryPlanner>,
    cache: ResponseCache,
    narrator: Option<Arc<Narrator>>,
    sentiment: SentimentAnalyzer,
    metrics: Arc<MetricsRegistry>,
    reload_lock: tokio::sync::Mutex<()>,
}

impl QueryEngine {
    /// Create an engine over `store` that plans with `model`
    pub fn new(store: Arc<dyn BlobStore>, model: Arc<dyn LanguageModel>, options: EngineOptions) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let planner = QueryPlanner::new(Arc::clone(&model), Arc::clone(&metrics))
            .with_model_retry(options.model_retry)
            .with_parse_retries(options.parse_retries);
        let narrator = options
            .narrative
            .then(|| Arc::new(Narrator::new(Arc::clone(&model), options.model_retry)));
        let sentiment = SentimentAnalyzer::new(Arc::clone(&model), options.model_retry);

        Self {
            loader: DatasetLoader::new(store, options.blob_retry, Arc::clone(&metrics)),
            catalog: DatasetCatalog::new(),
            planner: Arc::new(planner),
            cache: ResponseCache::new(),
            narrator,
            sentiment,
            metrics,
            reload_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Loads (or reloads) a dataset and publishes it.
    ///
    /// On failure the previously published version, if any, stays current.
    pub async fn load(&self, source: SourceRef) -> EngineResult<Arc<Dataset>> {
        let _serialized = self.reload_lock.lock().await;

        let dataset = self.loader.load(&source).await?;
        let name = source.name.clone();
        let previous = self.catalog.publish(source, dataset);
        let removed = self.cache.retain_set(&self.catalog.snapshot());
        if let Some(previous) = previous {
            let removed = removed.to_string();
            Logger::info(
                "DATASET_REPLACED",
                &[
                    ("cache_removed", &removed),
                    ("dataset", &name),
                    ("previous", previous.fingerprint().short()),
                ],
            );
        }
        self.catalog
            .get(&name)
            .ok_or_else(|| EngineError::Internal(format!("dataset '{}' vanished after publish", name)))
    }

    /// Loads every source concurrently; results are in input order
    pub async fn load_all(&self, sources: Vec<SourceRef>) -> Vec<EngineResult<Arc<Dataset>>> {
        join_all(sources.into_iter().map(|s| self.load(s))).await
    }

    /// Re-reads `name` from where it was originally loaded
    pub async fn reload(&self, name: &str) -> EngineResult<Arc<Dataset>> {
        let source = self
            .catalog
            .source_of(name)
            .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))?;
        self.load(source).await
    }

    /// Unpublishes `name` and drops its cached answers
    pub async fn remove(&self, name: &str) -> EngineResult<()> {
        let _serialized = self.reload_lock.lock().await;
        self.catalog
            .remove(name)
            .ok_or_else(|| EngineError::UnknownDataset(name.to_string()))?;
        self.cache.retain_set(&self.catalog.snapshot());
        Ok(())
    }

    /// Answers one question against the currently published datasets
    pub async fn ask(&self, question: &str) -> EngineResult<Answer> {
        self.metrics.increment_questions();
        let request_id = Uuid::new_v4();
        let id = request_id.to_string();
        let scope = ObservationScope::with_fields("ASK", &[("question", question), ("request_id", &id)]);

        let datasets = self.catalog.snapshot();
        if datasets.is_empty() {
            let err = EngineError::NoDatasets;
            scope.fail(err.kind(), &err.to_string());
            return Err(err);
        }

        let compute = {
            let planner = Arc::clone(&self.planner);
            let narrator = self.narrator.clone();
            let metrics = Arc::clone(&self.metrics);
            let question = question.to_string();
            let datasets = datasets.clone();
            let id = id.clone();
            move || answer_fresh(planner, narrator, metrics, question, datasets, id)
        };

        let result = match self.cache.get_or_compute(&datasets, question, compute).await {
            Ok(result) => result,
            Err(e) => {
                scope.fail(e.kind(), &e.to_string());
                return Err(e);
            }
        };

        match result.cache_status() {
            CacheStatus::Hit | CacheStatus::Shared => self.metrics.increment_cache_hits(),
            CacheStatus::Miss | CacheStatus::Bypassed => self.metrics.increment_cache_misses(),
        }

        let (narrative, narrative_error) = match &result.summary {
            Some(Summary::Written(text)) => (Some(text.clone()), None),
            Some(Summary::Unavailable) => (None, Some("Summary unavailable".to_string())),
            None => (None, None),
        };

        scope.complete_with_fields(&[("cache", result.cache_status().as_str())]);
        Ok(Answer {
            request_id,
            question: question.to_string(),
            result,
            narrative,
            narrative_error,
        })
    }

    /// Answers independent questions concurrently; results are in input order
    pub async fn ask_all<S: AsRef<str>>(&self, questions: &[S]) -> Vec<EngineResult<Answer>> {
        join_all(questions.iter().map(|q| self.ask(q.as_ref()))).await
    }

    /// Classifies the sentiment of `text`
    pub async fn analyze_sentiment(&self, text: &str) -> EngineResult<SentimentReport> {
        if text.trim().is_empty() {
            return Err(EngineError::InvalidRequest("no text to analyze".into()));
        }
        let scope = ObservationScope::new("SENTIMENT");
        match self.sentiment.analyze(text).await {
            Ok(report) => {
                scope.complete_with_fields(&[("label", report.label.as_str())]);
                Ok(report)
            }
            Err(e) => {
                let err = EngineError::from(e);
                scope.fail(err.kind(), &err.to_string());
                Err(err)
            }
        }
    }

    /// Classifies the sentiment of the text values in one column of `result`
    pub async fn column_sentiment(
        &self,
        result: &ExecutionResult,
        column: &str,
    ) -> EngineResult<SentimentReport> {
        let text = column_text(result, column).ok_or_else(|| {
            EngineError::InvalidRequest(format!("result column '{}' has no values to analyze", column))
        })?;
        self.analyze_sentiment(&text).await
    }

    /// Schema of the currently published datasets
    pub fn describe(&self) -> SchemaDescriptor {
        describe(&self.catalog.snapshot())
    }

    /// Currently published datasets
    pub fn datasets(&self) -> DatasetSet {
        self.catalog.snapshot()
    }

    /// Writes bytes to the blob store so they can be loaded later
    pub async fn upload(&self, location: &str, bytes: &[u8]) -> EngineResult<()> {
        self.loader.upload(location, bytes).await?;
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

/// Plan, execute and summarize without the cache
async fn answer_fresh(
    planner: Arc<QueryPlanner>,
    narrator: Option<Arc<Narrator>>,
    metrics: Arc<MetricsRegistry>,
    question: String,
    datasets: DatasetSet,
    request_id: String,
) -> EngineResult<ExecutionResult> {
    let descriptor = describe(&datasets);
    let plan = planner.plan(&question, &descriptor).await?;
    match PlanExecutor::execute(&plan, &datasets) {
        Ok(result) => {
            metrics.increment_executions();
            let Some(narrator) = narrator else {
                return Ok(result);
            };
            let summary = match narrator.narrate(&question, &result).await {
                Ok(text) => Summary::Written(text),
                Err(e) => {
                    Logger::warn(
                        "NARRATIVE_FAILED",
                        &[("reason", &e.to_string()), ("request_id", &request_id)],
                    );
                    Summary::Unavailable
                }
            };
            Ok(result.with_summary(summary))
        }
        Err(e) => {
            metrics.increment_execution_failures();
            Logger::warn(
                "EXECUTION_FAILED",
                &[("code", e.code().code()), ("plan", &plan.to_string())],
            );
            Err(e.into())
        }
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("datasets", &self.catalog.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
