//! Scripted model
//!
//! Replays a fixed sequence of replies and records every prompt. Used by
//! tests and by offline demos; never talks to the network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::{ModelError, ModelResult};
use super::model::LanguageModel;

/// A model that answers from a script
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelResult<String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedModel {
    /// Replies are consumed in order; once empty every call is `Rejected`
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = ModelResult<String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Convenience for a script of successful replies
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Append a reply to the end of the script
    pub fn push(&self, reply: ModelResult<String>) {
        lock(&self.replies).push_back(reply);
    }

    /// Every prompt received so far
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn calls(&self) -> usize {
        lock(&self.prompts).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        lock(&self.prompts).push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Rejected("script exhausted".into())))
    }
}
