//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only on process start
//! - Lock-free; `Relaxed` ordering is enough for counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one engine instance
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    datasets_loaded: AtomicU64,
    load_failures: AtomicU64,
    questions: AtomicU64,
    plans_generated: AtomicU64,
    plans_rejected: AtomicU64,
    model_calls: AtomicU64,
    model_retries: AtomicU64,
    executions: AtomicU64,
    execution_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// A dataset was loaded or reloaded
    pub fn increment_datasets_loaded(&self) {
        self.datasets_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// A dataset load failed terminally
    pub fn increment_load_failures(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A question was received
    pub fn increment_questions(&self) {
        self.questions.fetch_add(1, Ordering::Relaxed);
    }

    /// The planner returned a validated plan
    pub fn increment_plans_generated(&self) {
        self.plans_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// The planner gave up with an error
    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// One request was sent to the language model
    pub fn increment_model_calls(&self) {
        self.model_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// A transient model failure was retried
    pub fn increment_model_retries(&self) {
        self.model_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// A plan was executed successfully
    pub fn increment_executions(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    /// A plan failed during execution
    pub fn increment_execution_failures(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A question was answered from the cache
    pub fn increment_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A question required a fresh computation
    pub fn increment_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of model requests so far
    pub fn model_calls(&self) -> u64 {
        self.model_calls.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datasets_loaded: self.datasets_loaded.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            questions: self.questions.load(Ordering::Relaxed),
            plans_generated: self.plans_generated.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            model_calls: self.model_calls.load(Ordering::Relaxed),
            model_retries: self.model_retries.load(Ordering::Relaxed),
            executions: self.executions.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub datasets_loaded: u64,
    pub load_failures: u64,
    pub questions: u64,
    pub plans_generated: u64,
    pub plans_rejected: u64,
    pub model_calls: u64,
    pub model_retries: u64,
    pub executions: u64,
    pub execution_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
