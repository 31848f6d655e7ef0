//! Result types for pipeline execution

use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::TypeMismatches;
use crate::record::Record;

/// Counters collected during one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Records handed to the first stage
    pub input_count: usize,
    /// Records produced by the last stage
    pub output_count: usize,
    /// Number of stages applied
    pub stages_executed: usize,
    /// Soft type mismatches seen along the way
    pub type_mismatches: TypeMismatches,
}

/// Output of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Records in result order
    pub records: Vec<Record>,
    pub stats: ExecutionStats,
}

impl RunOutput {
    /// Returns true if no records were produced
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of results
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns an iterator over the records
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// `{ "records": [...], "stats": {...} }`
    pub fn to_json(&self) -> Value {
        json!({
            "records": self.records,
            "stats": self.stats,
        })
    }
}
