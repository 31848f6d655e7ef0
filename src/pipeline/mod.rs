//! Aggregation pipeline for docpipe
//!
//! Stages are parsed and validated into a `Pipeline`, then applied in order
//! to a snapshot of a collection. Supported stages:
//! - `$match`, `$group`, `$project`
//! - `$sort`, `$limit`, `$skip`
//! - `$count`

mod accumulator;
mod executor;
mod explain;
mod parser;
mod result;
mod runner;
mod sorter;
mod stage;

pub use executor::StageExecutor;
pub use explain::{ExplainPlan, StageExplain};
pub use parser::{parse_pipeline, parse_stage};
pub use result::{ExecutionStats, RunOutput};
pub use runner::{run, Pipeline};
pub use sorter::RecordSorter;
pub use stage::{
    AccumulatorOp, Aggregation, GroupSpec, KeySelector, SortDirection, SortKey, Stage, SumOperand,
};
