//! # Language Model
//!
//! The port the planner, the narrative step and sentiment analysis talk
//! through, plus two implementations:
//!
//! - [`ChatCompletionsModel`]: HTTP chat-completions endpoint
//! - [`ScriptedModel`]: replays canned replies

mod chat;
mod errors;
mod model;
mod scripted;

pub use chat::{ChatCompletionsModel, ChatSettings};
pub use errors::{ModelError, ModelResult};
pub use model::LanguageModel;
pub use scripted::ScriptedModel;
