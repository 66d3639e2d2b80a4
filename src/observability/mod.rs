//! Observability subsystem
//!
//! - Structured JSON logging to stderr
//! - Monotonic counters
//! - Scope-based begin/complete events
//!
//! # Principles
//!
//! 1. Observability is read-only and never fails the caller
//! 2. No background threads
//! 3. Deterministic output for identical events
//!
//! # Usage
//!
//! ```ignore
//! use tabquery::observability::{Logger, MetricsRegistry, ObservationScope};
//!
//! Logger::info("DATASET_LOADED", &[("dataset", "sales"), ("rows", "42")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_questions();
//!
//! let scope = ObservationScope::new("ASK");
//! // ... do work ...
//! scope.complete();
//! ```

mod logger;
mod metrics;
mod scope;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;
