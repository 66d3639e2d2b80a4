//! Narrative summaries and sentiment
//!
//! After a successful answer the engine may ask the model for a short
//! plain-language summary of the result. Failure here never fails the
//! answer.
//!
//! `SentimentAnalyzer` asks the model to classify free text as positive,
//! negative or neutral, with a short explanation.

use std::fmt::{self, Write};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::dataset::CellValue;
use crate::executor::{ExecutionResult, ResultBody};
use crate::llm::{LanguageModel, ModelError, ModelResult};
use crate::retry::RetryPolicy;

/// Rows shown to the model; larger tables are truncated
pub const MAX_NARRATIVE_ROWS: usize = 50;

/// Text values of a result column sent for sentiment analysis
pub const MAX_SENTIMENT_VALUES: usize = 50;

/// Writes result summaries
pub struct Narrator {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl Narrator {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// Summarizes `result` as the answer to `question`
    pub async fn narrate(&self, question: &str, result: &ExecutionResult) -> ModelResult<String> {
        let prompt = narrative_prompt(question, result);
        let model = &self.model;
        let text = self
            .retry
            .run("narrative", ModelError::is_transient, |_| model.complete(&prompt))
            .await
            .map_err(|e| e.into_inner())?;
        Ok(text.trim().to_string())
    }
}

/// Prompt listing the question and a tab-separated rendering of the result
pub fn narrative_prompt(question: &str, result: &ExecutionResult) -> String {
    let mut prompt = String::from(
        "Summarize this query result for a business reader in two or three plain sentences. \
         Mention the most notable values. Do not invent numbers.\n\n",
    );
    let _ = writeln!(prompt, "Question: {}", question.trim());
    prompt.push_str("Result:\n");

    match &result.body {
        ResultBody::Scalar { value } => {
            let _ = writeln!(prompt, "{}", value);
        }
        ResultBody::Table { columns, rows } => {
            let _ = writeln!(prompt, "{}", columns.join("\t"));
            for row in rows.iter().take(MAX_NARRATIVE_ROWS) {
                let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
                let _ = writeln!(prompt, "{}", cells.join("\t"));
            }
            if rows.len() > MAX_NARRATIVE_ROWS {
                let _ = writeln!(prompt, "... ({} more rows)", rows.len() - MAX_NARRATIVE_ROWS);
            }
        }
    }
    prompt
}

/// Sentiment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            "neutral" => Some(SentimentLabel::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category plus the model's reasoning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentReport {
    pub label: SentimentLabel,
    pub explanation: String,
}

/// Classifies the sentiment of free text
pub struct SentimentAnalyzer {
    model: Arc<dyn LanguageModel>,
    retry: RetryPolicy,
}

impl SentimentAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>, retry: RetryPolicy) -> Self {
        Self { model, retry }
    }

    /// Classifies `text`. A reply naming no category is a transport error.
    pub async fn analyze(&self, text: &str) -> ModelResult<SentimentReport> {
        let prompt = sentiment_prompt(text);
        let model = &self.model;
        let reply = self
            .retry
            .run("sentiment", ModelError::is_transient, |_| model.complete(&prompt))
            .await
            .map_err(|e| e.into_inner())?;
        parse_sentiment(&reply)
            .ok_or_else(|| ModelError::Transport("reply named no sentiment category".into()))
    }
}

/// Prompt asking for a category on the first line and a brief explanation
pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text and categorize it as positive, \
         negative, or neutral. Answer with a first line of the form \
         \"Sentiment: <category>\", then a brief explanation for your categorization.\n\n{}",
        text.trim()
    )
}

/// Reads the category from a `Sentiment:` line, else from the first
/// category word anywhere in the reply.
pub fn parse_sentiment(reply: &str) -> Option<SentimentReport> {
    static LINE: OnceLock<Option<Regex>> = OnceLock::new();
    static WORD: OnceLock<Option<Regex>> = OnceLock::new();
    let line = LINE
        .get_or_init(|| Regex::new(r"(?im)^\s*\**sentiment\**\s*:\s*\**\s*(positive|negative|neutral)\b.*$").ok())
        .as_ref()?;
    let word = WORD
        .get_or_init(|| Regex::new(r"(?i)\b(positive|negative|neutral)\b").ok())
        .as_ref()?;

    let (label, explanation) = match line.captures(reply) {
        Some(caps) => {
            let label = SentimentLabel::parse(&caps[1])?;
            let whole = caps.get(0)?;
            let rest = format!("{}{}", &reply[..whole.start()], &reply[whole.end()..]);
            (label, rest.trim().to_string())
        }
        None => {
            let caps = word.captures(reply)?;
            (SentimentLabel::parse(&caps[1])?, reply.trim().to_string())
        }
    };

    let explanation = if explanation.is_empty() {
        reply.trim().to_string()
    } else {
        explanation
    };
    Some(SentimentReport { label, explanation })
}

/// Non-empty values of `column`, one per line, for sentiment analysis.
/// `None` when the result has no such column or it holds no values.
pub fn column_text(result: &ExecutionResult, column: &str) -> Option<String> {
    let values = result.column_values(column)?;
    let lines: Vec<String> = values
        .into_iter()
        .filter(|v| !matches!(v, CellValue::Null))
        .take(MAX_SENTIMENT_VALUES)
        .map(|v| v.to_string())
        .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
