//! # Chat Completions Client
//!
//! POSTs a single user message to an OpenAI-style `chat/completions`
//! endpoint and returns `choices[0].message.content`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::errors::{ModelError, ModelResult};
use super::model::LanguageModel;

/// Generation settings sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.1,
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize, Debug)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for a chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionsModel {
    endpoint: String,
    api_key: String,
    settings: ChatSettings,
    client: Client,
}

impl ChatCompletionsModel {
    /// Create a client; `endpoint` is the full completions URL
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        settings: ChatSettings,
    ) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ModelError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            settings,
            client,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: self.settings.model.as_deref(),
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

fn map_transport(e: reqwest::Error) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(e.to_string())
    } else if e.is_connect() {
        ModelError::Unavailable(e.to_string())
    } else {
        ModelError::Transport(e.to_string())
    }
}

fn extract_content(response: ChatResponse) -> ModelResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ModelError::Transport("response contained no message content".into()))
}

#[async_trait]
impl LanguageModel for ChatCompletionsModel {
    async fn complete(&self, prompt: &str) -> ModelResult<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::from_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response.json().await.map_err(map_transport)?;
        extract_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let model = ChatCompletionsModel::new(
            "http://localhost:9/v1/chat/completions",
            "key",
            ChatSettings::default(),
        )
        .unwrap();
        let body = serde_json::to_value(model.request_body("hello")).unwrap();
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 2048);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_extract_content() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"dataset\":\"s\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_content(parsed).unwrap(), "{\"dataset\":\"s\"}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_content(empty), Err(ModelError::Transport(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let model = ChatCompletionsModel::new(
            "http://127.0.0.1:9/v1/chat/completions",
            "key",
            ChatSettings {
                timeout: Duration::from_secs(2),
                ..ChatSettings::default()
            },
        )
        .unwrap();
        let err = model.complete("hi").await.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
