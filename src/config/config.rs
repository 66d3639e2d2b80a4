//! Engine configuration file
//!
//! Precedence: file values, then `TQ_*` environment variables, then
//! validation. Every field except the model endpoint has a default, so a
//! minimal file is `{"llm": {"endpoint": "..."}}`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blob::{BlobStore, HttpBlobStore, LocalBlobStore};
use crate::engine::EngineOptions;
use crate::llm::{ChatCompletionsModel, ChatSettings};
use crate::observability::Severity;
use crate::retry::RetryPolicy;

use super::errors::{ConfigError, ConfigResult};

/// Where datasets are read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlobConfig {
    /// A directory on disk
    Local { root: PathBuf },
    /// A container behind an HTTP endpoint
    Http {
        base_url: String,
        container: String,
        /// Query-string token appended to every request
        #[serde(default)]
        token: Option<String>,
        #[serde(default = "default_blob_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for BlobConfig {
    fn default() -> Self {
        BlobConfig::Local {
            root: PathBuf::from("."),
        }
    }
}

/// Chat-completions endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Full completions URL (required)
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Model or deployment name; omitted from requests when unset
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Retry budgets for the two I/O boundaries and for unparseable replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retries")]
    pub blob_retries: u32,

    #[serde(default = "default_retries")]
    pub model_retries: u32,

    #[serde(default = "default_parse_retries")]
    pub parse_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            blob_retries: default_retries(),
            model_retries: default_retries(),
            parse_retries: default_parse_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    fn policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }

    pub fn blob_policy(&self) -> RetryPolicy {
        self.policy(self.blob_retries)
    }

    pub fn model_policy(&self) -> RetryPolicy {
        self.policy(self.model_retries)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Ask the model for a plain-text summary of each answer
    #[serde(default)]
    pub enabled: bool,
}

/// Top-level configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub blob: BlobConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Minimum log severity: trace, info, warn, error or fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blob: BlobConfig::default(),
            llm: LlmConfig::default(),
            retry: RetryConfig::default(),
            narrative: NarrativeConfig::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_blob_timeout_secs() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_llm_timeout_secs() -> u64 {
    60
}
fn default_retries() -> u32 {
    3
}
fn default_parse_retries() -> u32 {
    crate::planner::DEFAULT_PARSE_RETRIES
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load from `path`, apply the process environment, then validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but only the blob store and log level must be valid.
    /// Used by commands that never reach the model.
    pub fn load_storage(path: &Path) -> ConfigResult<Self> {
        let config = Self::read(path)?;
        config.validate_storage()?;
        Ok(config)
    }

    fn read(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::read_failed(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse without overrides or validation
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::invalid_json(format!("invalid config JSON: {}", e)))
    }

    /// Applies `TQ_*` overrides looked up through `lookup`.
    ///
    /// `TQ_BLOB_ROOT` switches to a local store; `TQ_BLOB_URL` switches to
    /// an HTTP store, reusing the configured container when
    /// `TQ_BLOB_CONTAINER` is absent.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("TQ_BLOB_ROOT") {
            self.blob = BlobConfig::Local {
                root: PathBuf::from(root),
            };
        }

        if let Some(url) = lookup("TQ_BLOB_URL") {
            let (container, token, timeout_secs) = match &self.blob {
                BlobConfig::Http {
                    container,
                    token,
                    timeout_secs,
                    ..
                } => (container.clone(), token.clone(), *timeout_secs),
                BlobConfig::Local { .. } => (String::new(), None, default_blob_timeout_secs()),
            };
            self.blob = BlobConfig::Http {
                base_url: url,
                container,
                token,
                timeout_secs,
            };
        }

        if let BlobConfig::Http {
            container, token, ..
        } = &mut self.blob
        {
            if let Some(value) = lookup("TQ_BLOB_CONTAINER") {
                *container = value;
            }
            if let Some(value) = lookup("TQ_BLOB_TOKEN") {
                *token = Some(value);
            }
        }

        if let Some(value) = lookup("TQ_LLM_ENDPOINT") {
            self.llm.endpoint = value;
        }
        if let Some(value) = lookup("TQ_LLM_API_KEY") {
            self.llm.api_key = value;
        }
        if let Some(value) = lookup("TQ_LLM_MODEL") {
            self.llm.model = Some(value);
        }
        if let Some(value) = lookup("TQ_LOG_LEVEL") {
            self.log_level = value;
        }
    }

    /// Checks ranges and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_storage()?;

        if !is_http_url(&self.llm.endpoint) {
            return Err(ConfigError::invalid_value(
                "llm.endpoint",
                format!("'{}' is not an http(s) URL", self.llm.endpoint),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid_value(
                "llm.temperature",
                "must be between 0 and 2",
            ));
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::invalid_value("llm.max_tokens", "must be > 0"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("llm.timeout_secs", "must be > 0"));
        }

        Ok(())
    }

    /// Log level, blob store and retry settings
    pub fn validate_storage(&self) -> ConfigResult<()> {
        self.log_severity()?;

        match &self.blob {
            BlobConfig::Local { root } => {
                if root.as_os_str().is_empty() {
                    return Err(ConfigError::invalid_value("blob.root", "must not be empty"));
                }
            }
            BlobConfig::Http {
                base_url,
                container,
                timeout_secs,
                ..
            } => {
                if !is_http_url(base_url) {
                    return Err(ConfigError::invalid_value(
                        "blob.base_url",
                        format!("'{}' is not an http(s) URL", base_url),
                    ));
                }
                if container.trim_matches('/').is_empty() {
                    return Err(ConfigError::invalid_value("blob.container", "must not be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(ConfigError::invalid_value("blob.timeout_secs", "must be > 0"));
                }
            }
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::invalid_value(
                "retry.max_delay_ms",
                "must be >= retry.base_delay_ms",
            ));
        }

        Ok(())
    }

    /// Parsed `log_level`
    pub fn log_severity(&self) -> ConfigResult<Severity> {
        self.log_level
            .parse()
            .map_err(|reason: String| ConfigError::invalid_value("log_level", reason))
    }

    /// Blob store described by the `blob` section
    pub fn build_blob_store(&self) -> ConfigResult<Arc<dyn BlobStore>> {
        match &self.blob {
            BlobConfig::Local { root } => Ok(Arc::new(LocalBlobStore::new(root.clone()))),
            BlobConfig::Http {
                base_url,
                container,
                token,
                timeout_secs,
            } => {
                let store = HttpBlobStore::new(
                    base_url.clone(),
                    container.clone(),
                    token.clone(),
                    Duration::from_secs(*timeout_secs),
                )
                .map_err(|e| ConfigError::build_failed(e.to_string()))?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Model client described by the `llm` section
    pub fn build_model(&self) -> ConfigResult<ChatCompletionsModel> {
        let settings = ChatSettings {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        };
        ChatCompletionsModel::new(self.llm.endpoint.clone(), self.llm.api_key.clone(), settings)
            .map_err(|e| ConfigError::build_failed(e.to_string()))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            blob_retry: self.retry.blob_policy(),
            model_retry: self.retry.model_policy(),
            parse_retries: self.retry.parse_retries,
            narrative: self.narrative.enabled,
        }
    }
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}
