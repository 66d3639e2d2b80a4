//! The language model port

use async_trait::async_trait;

use super::errors::ModelResult;

/// Anything that turns a prompt into a completion
///
/// The planner, the narrative step and sentiment analysis depend only on
/// this trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model's raw text reply to `prompt`
    async fn complete(&self, prompt: &str) -> ModelResult<String>;
}

#[async_trait]
impl<T: LanguageModel + ?Sized> LanguageModel for std::sync::Arc<T> {
    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        (**self).complete(prompt).await
    }
}
