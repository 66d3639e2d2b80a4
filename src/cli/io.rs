//! JSON line I/O for the CLI
//!
//! - Input: one JSON object per stdin line
//! - Output: one JSON object per stdout line
//! - Logs go to stderr, never stdout

use std::io::{self, BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Iterates JSON requests from stdin; blank lines are skipped
pub fn read_requests() -> impl Iterator<Item = CliResult<Value>> {
    let stdin = io::stdin();
    stdin.lock().lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(serde_json::from_str(&line).map_err(|e| {
            CliError::invalid_request(format!("request is not valid JSON: {}", e))
        })),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_json(&response.to_string())
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_json(&response.to_string())
}

/// Write one already-rendered JSON line to stdout
pub fn write_json(json_str: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", json_str)?;
    stdout.flush()?;
    Ok(())
}
