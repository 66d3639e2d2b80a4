//! # Query Engine
//!
//! The public entry point: load datasets, ask questions, get answers.
//!
//! ```ignore
//! let engine = QueryEngine::new(store, model, EngineOptions::default());
//! engine.load("sales.csv".parse()?).await?;
//! let answer = engine.ask("total sales by region").await?;
//! println!("{}", JsonPresenter.render(&answer));
//! ```

mod answer;
mod engine;
mod errors;
mod narrative;
mod presenter;

pub use answer::Answer;
pub use engine::{EngineOptions, QueryEngine};
pub use errors::{EngineError, EngineResult};
pub use narrative::{
    column_text, narrative_prompt, parse_sentiment, sentiment_prompt, Narrator, SentimentAnalyzer,
    SentimentLabel, SentimentReport, MAX_NARRATIVE_ROWS, MAX_SENTIMENT_VALUES,
};
pub use presenter::{JsonPresenter, Presenter};
