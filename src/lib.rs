//! docpipe - In-memory aggregation pipelines over JSON records
//!
//! Records live in named collections. A pipeline of `$match`, `$group`,
//! `$project`, `$sort`, `$limit`, `$skip` and `$count` stages is validated
//! as a whole, then applied in order to a snapshot of the collection.

pub mod cli;
pub mod errors;
pub mod filter;
pub mod pipeline;
pub mod record;

pub use errors::{ConfigErrorCode, ConfigurationError, PipelineResult, TypeMismatches};
pub use filter::{parse_filter, Comparison, Filter, PredicateFilter};
pub use pipeline::{parse_pipeline, run, Pipeline, RunOutput, Stage};
pub use record::{Collection, Record};
