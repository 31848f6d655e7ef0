//! Pipeline runner
//!
//! A `Pipeline` is an ordered list of validated stages. Building one checks
//! every stage up front, so a built pipeline always runs to completion.
//! Each stage receives exactly the previous stage's output; the source
//! records are never modified.

use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{PipelineResult, TypeMismatches};
use crate::record::{Collection, Record};

use super::executor::StageExecutor;
use super::explain::ExplainPlan;
use super::parser::parse_pipeline;
use super::result::{ExecutionStats, RunOutput};
use super::stage::Stage;

/// A validated, runnable sequence of stages
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Validates every stage. The first failure is returned, tagged with its
    /// stage index.
    pub fn new(stages: Vec<Stage>) -> PipelineResult<Self> {
        for (index, stage) in stages.iter().enumerate() {
            stage.validate().map_err(|e| e.at_stage(index))?;
        }
        Ok(Self { stages })
    }

    /// Parses and validates a pipeline document
    pub fn from_json(value: &Value) -> PipelineResult<Self> {
        Self::new(parse_pipeline(value)?)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn explain(&self) -> ExplainPlan {
        ExplainPlan::from_stages(&self.stages)
    }

    /// Runs the pipeline over `records`.
    ///
    /// An empty pipeline returns the input unchanged.
    pub fn execute(&self, records: &[Record]) -> RunOutput {
        let mut mismatches = TypeMismatches::default();
        let mut current = records.to_vec();

        for (index, stage) in self.stages.iter().enumerate() {
            let input = current.len();
            current = StageExecutor::apply(stage, current, &mut mismatches);
            debug!(
                stage = stage.name(),
                index,
                input,
                output = current.len(),
                "stage applied"
            );
        }

        let stats = ExecutionStats {
            input_count: records.len(),
            output_count: current.len(),
            stages_executed: self.stages.len(),
            type_mismatches: mismatches,
        };
        if mismatches.total() > 0 {
            debug!(
                comparisons = mismatches.comparisons(),
                accumulators = mismatches.accumulators(),
                "type mismatches resolved during run"
            );
        }

        RunOutput {
            records: current,
            stats,
        }
    }
}

/// Validates `stages` and runs them over the collection.
///
/// Nothing is executed if any stage is invalid.
pub fn run(collection: &Collection, stages: &[Stage]) -> PipelineResult<RunOutput> {
    let pipeline = Pipeline::new(stages.to_vec())?;
    let output = pipeline.execute(collection.records());
    info!(
        collection = collection.name(),
        stages = pipeline.len(),
        input = output.stats.input_count,
        output = output.len(),
        "pipeline complete"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigErrorCode;
    use crate::filter::{Comparison, Filter};
    use crate::pipeline::stage::{Aggregation, KeySelector, SortDirection, SortKey};
    use serde_json::json;

    fn students() -> Collection {
        Collection::from_json(
            "students",
            json!([
                {"name": "Alice", "age": 20, "marks": 85, "city": "Delhi"},
                {"name": "Bob", "age": 22, "marks": 67, "city": "Mumbai"},
                {"name": "Charlie", "age": 21, "marks": 92, "city": "Delhi"},
                {"name": "David", "age": 23, "marks": 58, "city": "Chennai"},
                {"name": "Eva", "age": 20, "marks": 74, "city": "Mumbai"}
            ]),
        )
        .unwrap()
    }

    fn names(output: &RunOutput) -> Vec<&str> {
        output
            .iter()
            .map(|r| r.get("name").and_then(Value::as_str).unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let collection = students();
        let output = run(&collection, &[]).unwrap();
        assert_eq!(output.records, collection.records());
        assert_eq!(output.stats.stages_executed, 0);
    }

    #[test]
    fn test_invalid_stage_aborts_before_running() {
        let stages = vec![
            Stage::filter(Filter::all()),
            Stage::Limit(-1),
            Stage::Skip(-1),
        ];
        let err = run(&students(), &stages).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::NegativeLimit);
        assert_eq!(err.stage(), Some(1));
    }

    #[test]
    fn test_match_is_idempotent() {
        let filter: Filter = Comparison::gt("marks", json!(70)).into();
        let once = run(&students(), &[Stage::filter(filter.clone())]).unwrap();
        let twice = run(
            &students(),
            &[Stage::filter(filter.clone()), Stage::filter(filter)],
        )
        .unwrap();
        assert_eq!(once.records, twice.records);
    }

    #[test]
    fn test_sort_then_sort_keeps_previous_order_for_ties() {
        let output = run(
            &students(),
            &[
                Stage::sort("marks", SortDirection::Descending),
                Stage::sort("age", SortDirection::Ascending),
            ],
        )
        .unwrap();
        // age 20 ties keep the marks-descending order
        assert_eq!(names(&output), vec!["Alice", "Eva", "Charlie", "Bob", "David"]);
    }

    #[test]
    fn test_stats_are_filled() {
        let output = run(
            &students(),
            &[
                Stage::filter(Comparison::gt("marks", json!("seventy")).into()),
                Stage::Limit(3),
            ],
        )
        .unwrap();
        assert!(output.is_empty());
        assert_eq!(output.stats.input_count, 5);
        assert_eq!(output.stats.output_count, 0);
        assert_eq!(output.stats.stages_executed, 2);
        assert_eq!(output.stats.type_mismatches.comparisons(), 5);
    }

    #[test]
    fn test_source_collection_untouched() {
        let collection = students();
        let before = collection.clone();
        run(
            &collection,
            &[
                Stage::group(KeySelector::field("city"), vec![Aggregation::count("n")]),
                Stage::Sort(vec![SortKey::desc("n")]),
            ],
        )
        .unwrap();
        assert_eq!(collection, before);
    }

    #[test]
    fn test_from_json_validates() {
        let err = Pipeline::from_json(&json!([{"$match": {}}, {"$project": {}}])).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::EmptyProjection);
        assert_eq!(err.stage(), Some(1));

        let pipeline = Pipeline::from_json(&json!([{"$match": {"city": "Delhi"}}])).unwrap();
        assert_eq!(pipeline.len(), 1);
        assert!(pipeline.explain().accepted);
    }
}
