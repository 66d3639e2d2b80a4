//! # Query Planner
//!
//! Turns a free-text question into a [`QueryPlan`] by asking a language
//! model, then checks the plan against the schema before anything runs.
//!
//! - A plan that passes validation references only existing columns,
//!   compares values of compatible types, and has an executable shape
//! - Validation is pure; only the model call suspends
//! - Identical (question, schema, feedback) produce identical prompts

mod ast;
mod errors;
mod parser;
mod planner;
mod prompt;
mod validator;

pub use ast::{
    joined_column_name, AggregateFunction, Comparator, JoinKind, Operation, QueryPlan,
    SortDirection, COUNT_ALL,
};
pub use errors::{PlanningError, PlanningErrorCode, PlanningResult, Severity};
pub use parser::{extract_json, parse_plan};
pub use planner::{QueryPlanner, DEFAULT_PARSE_RETRIES};
pub use prompt::build_prompt;
pub use validator::validate;
