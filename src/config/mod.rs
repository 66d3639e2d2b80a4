//! # Configuration
//!
//! JSON file plus `TQ_*` environment overrides. The CLI loads one
//! [`EngineConfig`] per invocation and builds the blob store, model client
//! and engine options from it.

mod config;
mod errors;

pub use config::{BlobConfig, EngineConfig, LlmConfig, NarrativeConfig, RetryConfig};
pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};
