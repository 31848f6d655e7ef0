//! CLI module for docpipe
//!
//! Provides command-line interface for:
//! - run: Execute a pipeline file over a records file
//! - find: Filter, sort and limit a records file
//! - explain: Validate and describe a pipeline file

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, find, load_collection, run, run_command, run_pipeline};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json_file, write_error, write_response};
