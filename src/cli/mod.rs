//! CLI module for tabquery
//!
//! Provides command-line interface for:
//! - describe: load datasets and print their schema
//! - ask: answer one question
//! - serve: answer JSON requests from stdin
//! - upload: copy a local file into the blob store

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{ask, describe, handle_request, run, run_command, serve, upload, ServeRequest};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_json, write_response};
