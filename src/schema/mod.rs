//! # Schema Index
//!
//! Turns loaded datasets into a [`SchemaDescriptor`]: a structural view the
//! planner validates against, plus the text it shows the model.
//!
//! - No I/O
//! - Deterministic: identical sets render byte-identical text
//! - Never persisted; rebuilt from the catalog snapshot per question

mod describe;
mod types;

pub use describe::describe;
pub use types::{ColumnDescriptor, DatasetDescriptor, SchemaDescriptor};
