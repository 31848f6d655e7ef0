//! CLI argument definitions using clap
//!
//! Commands:
//! - docpipe run --data <file> --pipeline <file> [--config <file>]
//! - docpipe find --data <file> --filter <json> [--sort <json>] [--limit <n>]
//! - docpipe explain --pipeline <file>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docpipe - aggregation pipelines over JSON record collections
#[derive(Parser, Debug)]
#[command(name = "docpipe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a pipeline over a collection
    Run {
        /// JSON file holding an array of records
        #[arg(long)]
        data: PathBuf,

        /// JSON file holding an array of stage documents
        #[arg(long)]
        pipeline: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Filter a collection, optionally sorting and limiting the result
    Find {
        /// JSON file holding an array of records
        #[arg(long)]
        data: PathBuf,

        /// Filter document, e.g. '{"marks": {"$gt": 70}}'
        #[arg(long, default_value = "{}")]
        filter: String,

        /// Sort document, e.g. '{"marks": -1}'
        #[arg(long)]
        sort: Option<String>,

        /// Maximum number of records to return
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a pipeline and describe its stages without running it
    Explain {
        /// JSON file holding an array of stage documents
        #[arg(long)]
        pipeline: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
