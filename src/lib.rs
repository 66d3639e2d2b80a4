//! tabquery - plain-language questions over tabular data in blob storage
//!
//! A question flows through:
//! 1. `dataset`: blobs parsed into typed, fingerprinted tables
//! 2. `schema`: a deterministic description the model can read
//! 3. `planner`: model reply parsed and validated into a `QueryPlan`
//! 4. `executor`: the plan run against the loaded tables
//! 5. `cache`: single-flight reuse keyed by question and data fingerprint
//!
//! `engine::QueryEngine` ties these together; `cli` is the binary's front.

pub mod blob;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod executor;
pub mod llm;
pub mod observability;
pub mod planner;
pub mod retry;
pub mod schema;
