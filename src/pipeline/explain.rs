//! Explain output for pipelines
//!
//! Describes what a pipeline will do without running it. Output is
//! deterministic so it can be diffed.

use std::fmt;

use serde::Serialize;

use crate::errors::ConfigurationError;

use super::stage::Stage;

/// One described stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageExplain {
    pub index: usize,
    /// `$match`, `$group`, ...
    pub operator: String,
    pub detail: String,
}

/// Explain output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainPlan {
    /// Whether the pipeline was built
    pub accepted: bool,
    /// Stage descriptions (if accepted)
    pub stages: Vec<StageExplain>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Index of the offending stage (if known)
    pub rejection_stage: Option<usize>,
}

impl ExplainPlan {
    /// Creates an explain plan from validated stages
    pub fn from_stages(stages: &[Stage]) -> Self {
        let stages = stages
            .iter()
            .enumerate()
            .map(|(index, stage)| StageExplain {
                index,
                operator: stage.name().to_string(),
                detail: describe(stage),
            })
            .collect();

        Self {
            accepted: true,
            stages,
            rejection_code: None,
            rejection_reason: None,
            rejection_stage: None,
        }
    }

    /// Creates an explain plan from a build error
    pub fn from_error(err: &ConfigurationError) -> Self {
        Self {
            accepted: false,
            stages: Vec::new(),
            rejection_code: Some(err.code().code().to_string()),
            rejection_reason: Some(err.message().to_string()),
            rejection_stage: err.stage(),
        }
    }
}

fn describe(stage: &Stage) -> String {
    match stage {
        Stage::Match(filter) => filter.to_string(),
        Stage::Group(spec) => {
            let mut parts = vec![format!("_id: {}", spec.key)];
            parts.extend(
                spec.aggregations
                    .iter()
                    .map(|a| format!("{}: {}", a.output, a.op)),
            );
            parts.join(", ")
        }
        Stage::Project(fields) => fields.join(", "),
        Stage::Sort(keys) => keys
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Stage::Limit(n) | Stage::Skip(n) => n.to_string(),
        Stage::Count(name) => name.clone(),
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if self.accepted {
            writeln!(f, "Status: ACCEPTED")?;
            writeln!(f, "Stages: {}", self.stages.len())?;
            for stage in &self.stages {
                writeln!(f, "  [{}] {} {}", stage.index, stage.operator, stage.detail)?;
            }
        } else {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(stage) = self.rejection_stage {
                writeln!(f, "Stage: {}", stage)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
        }

        Ok(())
    }
}
