//! CLI command implementations
//!
//! Each command loads its inputs, builds a pipeline, and writes a single
//! JSON response to stdout. A pipeline that fails to build never touches
//! the data.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::filter::parse_filter;
use crate::pipeline::{parse_stage, ExplainPlan, Pipeline, RunOutput, Stage};
use crate::record::Collection;

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Parse arguments, run the command, report failures on stdout
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run {
            data,
            pipeline,
            config,
        } => {
            let config = Config::load_or_default(config.as_deref())?;
            init_logging(&config);
            let output = run_pipeline(&data, &pipeline, &config)?;
            write_response(output.to_json(), config.pretty)
        }
        Command::Find {
            data,
            filter,
            sort,
            limit,
            config,
        } => {
            let config = Config::load_or_default(config.as_deref())?;
            init_logging(&config);
            let output = find(&data, &filter, sort.as_deref(), limit, &config)?;
            write_response(output.to_json(), config.pretty)
        }
        Command::Explain { pipeline } => {
            let config = Config::default();
            init_logging(&config);
            let plan = explain(&pipeline)?;
            write_response(serde_json::to_value(&plan)?, config.pretty)
        }
    }
}

/// Logs go to stderr. RUST_LOG wins over the configured filter.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.env_filter());
    // a subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Loads the records file as a collection named after the file stem
pub fn load_collection(path: &Path, config: &Config) -> CliResult<Collection> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());

    let value = read_json_file(path)?;
    let count = value.as_array().map(Vec::len).unwrap_or(0);
    if count > config.max_documents {
        return Err(CliError::too_many_documents(count, config.max_documents));
    }

    let collection = Collection::from_json(name, value)?;
    debug!(collection = collection.name(), records = collection.len(), "collection loaded");
    Ok(collection)
}

/// Runs a pipeline file over a records file
pub fn run_pipeline(data: &Path, pipeline: &Path, config: &Config) -> CliResult<RunOutput> {
    // Build first so a bad pipeline never loads the data
    let pipeline = Pipeline::from_json(&read_json_file(pipeline)?)?;
    let collection = load_collection(data, config)?;

    let output = pipeline.execute(collection.records());
    info!(
        collection = collection.name(),
        stages = pipeline.len(),
        output = output.len(),
        "run complete"
    );
    Ok(output)
}

/// Filter, then optionally sort and limit
pub fn find(
    data: &Path,
    filter: &str,
    sort: Option<&str>,
    limit: Option<i64>,
    config: &Config,
) -> CliResult<RunOutput> {
    let filter: Value = serde_json::from_str(filter)
        .map_err(|e| CliError::input_error(format!("Invalid --filter JSON: {}", e)))?;

    let mut stages = vec![Stage::Match(parse_filter(&filter)?)];
    if let Some(sort) = sort {
        let sort: Value = serde_json::from_str(sort)
            .map_err(|e| CliError::input_error(format!("Invalid --sort JSON: {}", e)))?;
        stages.push(parse_stage(&json!({ "$sort": sort }))?);
    }
    if let Some(limit) = limit {
        stages.push(Stage::Limit(limit));
    }

    let pipeline = Pipeline::new(stages)?;
    let collection = load_collection(data, config)?;
    Ok(pipeline.execute(collection.records()))
}

/// Describes a pipeline file. Build errors become a rejected plan.
pub fn explain(pipeline: &Path) -> CliResult<ExplainPlan> {
    let document = read_json_file(pipeline)?;
    Ok(match Pipeline::from_json(&document) {
        Ok(pipeline) => pipeline.explain(),
        Err(e) => ExplainPlan::from_error(&e),
    })
}
