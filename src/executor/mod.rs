//! # Plan Executor
//!
//! Runs a [`QueryPlan`](crate::planner::QueryPlan) over loaded datasets and
//! produces an [`ExecutionResult`].
//!
//! # Execution rules
//!
//! 1. Operations apply strictly in plan order
//! 2. Null cells never satisfy a filter and never count in an aggregate
//! 3. Sorting is stable; ascending puts nulls first
//! 4. Joins are inner hash joins on a shared key column
//! 5. An ungrouped aggregate yields a scalar; everything else a table
//!
//! Execution is synchronous and pure. It never touches storage or the
//! model, so it is safe to call from any task.

mod aggregate;
mod errors;
mod executor;
mod filters;
mod join;
mod result;
mod sorter;

pub use errors::{ExecResult, ExecutionError, ExecutionErrorCode};
pub use executor::PlanExecutor;
pub use result::{CacheStatus, ExecutionResult, Provenance, ResultBody, Summary};
