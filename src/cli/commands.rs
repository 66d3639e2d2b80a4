//! CLI command implementations
//!
//! Every command follows the same boot sequence:
//! 1. Load and validate configuration (file, then environment)
//! 2. Apply the log level
//! 3. Build the blob store and model client
//! 4. Start a tokio runtime and load the named datasets
//!
//! A failed dataset load aborts the command before any question is asked.
//! `upload` stops after step 3's blob store: it never needs the model.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::dataset::{DatasetLoader, SourceRef};
use crate::engine::{JsonPresenter, Presenter, QueryEngine};
use crate::observability::{Logger, MetricsRegistry};

use super::args::{Cli, Command};
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{read_requests, write_error, write_json, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Describe { config, datasets } => describe(&config, datasets),
        Command::Ask {
            config,
            datasets,
            question,
        } => ask(&config, datasets, &question),
        Command::Serve { config, datasets } => serve(&config, datasets),
        Command::Upload { config, file, name } => upload(&config, &file, &name),
        Command::Sentiment { config, text } => sentiment(&config, &text),
    }
}

/// Load datasets and print the schema description
pub fn describe(config_path: &Path, datasets: Vec<SourceRef>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let rt = runtime()?;

    rt.block_on(load_datasets(&engine, datasets))?;
    write_response(describe_payload(&engine))
}

/// Answer one question, print the answer, exit
pub fn ask(config_path: &Path, datasets: Vec<SourceRef>, question: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let rt = runtime()?;

    rt.block_on(load_datasets(&engine, datasets))?;

    let presenter = JsonPresenter;
    match rt.block_on(engine.ask(question)) {
        Ok(answer) => write_json(&presenter.render(&answer)),
        Err(e) => {
            write_json(&presenter.render_error(&e))?;
            Err(CliError::query_failed(&e))
        }
    }
}

/// Classify the sentiment of `text` and print the report
pub fn sentiment(config_path: &Path, text: &str) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let rt = runtime()?;

    match rt.block_on(engine.analyze_sentiment(text)) {
        Ok(report) => write_response(json!(report)),
        Err(e) => {
            write_json(&JsonPresenter.render_error(&e))?;
            Err(CliError::query_failed(&e))
        }
    }
}

/// Load datasets, then answer requests from stdin until EOF.
///
/// Accepted lines:
/// - `{"question": "..."}`
/// - `{"sentiment": "..."}`
/// - `{"reload": "<dataset>"}`
/// - `{"describe": true}`
/// - `{"stats": true}`
///
/// A bad request gets an error line; only stdin/stdout failures end the loop.
pub fn serve(config_path: &Path, datasets: Vec<SourceRef>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let rt = runtime()?;

    rt.block_on(load_datasets(&engine, datasets))?;
    let names = engine.datasets().names().join(",");
    Logger::info("SERVE_READY", &[("datasets", &names)]);

    let presenter = JsonPresenter;
    for request in read_requests() {
        let line = match request.and_then(|value| ServeRequest::parse(&value)) {
            Ok(request) => rt.block_on(handle_request(&engine, &presenter, request)),
            Err(e) if e.code() == &CliErrorCode::InvalidRequest => {
                JsonPresenter::error(e.code_str(), e.message())
            }
            Err(e) => {
                // stdin is gone; nothing more to serve
                write_error(e.code_str(), e.message())?;
                return Err(e);
            }
        };
        write_json(&line)?;
    }

    Logger::info("SERVE_STOPPED", &[]);
    Ok(())
}

/// Copy a local file into the configured blob store
pub fn upload(config_path: &Path, file: &Path, name: &str) -> CliResult<()> {
    let config = EngineConfig::load_storage(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    let loader = DatasetLoader::new(
        config.build_blob_store()?,
        config.retry.blob_policy(),
        Arc::new(MetricsRegistry::new()),
    );
    let bytes = fs::read(file)
        .map_err(|e| CliError::io_error(format!("failed to read {}: {}", file.display(), e)))?;

    let rt = runtime()?;
    rt.block_on(loader.upload(name, &bytes))
        .map_err(|e| CliError::io_error(format!("upload of {} failed: {}", name, e)))?;

    write_response(json!({"name": name, "bytes": bytes.len()}))
}

/// One parsed serve request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeRequest {
    Question(String),
    Sentiment(String),
    Reload(String),
    Describe,
    Stats,
}

impl ServeRequest {
    /// Accepts an object with exactly one recognised key
    pub fn parse(value: &Value) -> CliResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CliError::invalid_request("request must be a JSON object"))?;
        if obj.len() != 1 {
            return Err(CliError::invalid_request(
                "request must have exactly one of: question, sentiment, reload, describe, stats",
            ));
        }

        let (key, arg) = match obj.iter().next() {
            Some(entry) => entry,
            None => return Err(CliError::invalid_request("empty request")),
        };
        match (key.as_str(), arg) {
            ("question", Value::String(q)) if !q.trim().is_empty() => {
                Ok(ServeRequest::Question(q.clone()))
            }
            ("question", _) => Err(CliError::invalid_request(
                "\"question\" must be a non-empty string",
            )),
            ("sentiment", Value::String(text)) if !text.trim().is_empty() => {
                Ok(ServeRequest::Sentiment(text.clone()))
            }
            ("sentiment", _) => Err(CliError::invalid_request(
                "\"sentiment\" must be a non-empty string",
            )),
            ("reload", Value::String(name)) => Ok(ServeRequest::Reload(name.clone())),
            ("reload", _) => Err(CliError::invalid_request(
                "\"reload\" must be a dataset name",
            )),
            ("describe", Value::Bool(true)) => Ok(ServeRequest::Describe),
            ("stats", Value::Bool(true)) => Ok(ServeRequest::Stats),
            (other, _) => Err(CliError::invalid_request(format!(
                "unsupported request '{}'",
                other
            ))),
        }
    }
}

/// Runs one request and renders its response line
pub async fn handle_request(
    engine: &QueryEngine,
    presenter: &dyn Presenter,
    request: ServeRequest,
) -> String {
    match request {
        ServeRequest::Question(question) => match engine.ask(&question).await {
            Ok(answer) => presenter.render(&answer),
            Err(e) => presenter.render_error(&e),
        },
        ServeRequest::Sentiment(text) => match engine.analyze_sentiment(&text).await {
            Ok(report) => JsonPresenter::ok(json!(report)),
            Err(e) => presenter.render_error(&e),
        },
        ServeRequest::Reload(name) => match engine.reload(&name).await {
            Ok(dataset) => JsonPresenter::ok(json!({
                "dataset": dataset.name(),
                "rows": dataset.row_count(),
                "fingerprint": dataset.fingerprint(),
            })),
            Err(e) => presenter.render_error(&e),
        },
        ServeRequest::Describe => JsonPresenter::ok(describe_payload(engine)),
        ServeRequest::Stats => JsonPresenter::ok(json!({
            "metrics": engine.metrics(),
            "cache": engine.cache_stats(),
            "entries": engine.cache().entries(),
        })),
    }
}

fn describe_payload(engine: &QueryEngine) -> Value {
    let schema = engine.describe();
    json!({
        "fingerprint": schema.fingerprint(),
        "datasets": schema.datasets(),
        "text": schema.text(),
    })
}

fn load_config(path: &Path) -> CliResult<EngineConfig> {
    let config = EngineConfig::load(path)?;
    Logger::set_min_severity(config.log_severity()?);
    Ok(config)
}

fn build_engine(config: &EngineConfig) -> CliResult<QueryEngine> {
    let store = config.build_blob_store()?;
    let model = Arc::new(config.build_model()?);
    Ok(QueryEngine::new(store, model, config.engine_options()))
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("failed to create tokio runtime: {}", e)))
}

async fn load_datasets(engine: &QueryEngine, datasets: Vec<SourceRef>) -> CliResult<()> {
    let names: Vec<String> = datasets.iter().map(|s| s.name.clone()).collect();
    for (name, result) in names.iter().zip(engine.load_all(datasets).await) {
        result.map_err(|e| CliError::load_failed(name, &e))?;
    }
    Ok(())
}
