//! Error types for docpipe
//!
//! Two kinds of failure exist:
//! - `ConfigurationError`: a stage or filter is structurally invalid. Raised
//!   while a pipeline is being built, never once records are flowing.
//! - Data type mismatches: a comparison or accumulator met a value of an
//!   incompatible type. These are soft; they are tallied in
//!   `TypeMismatches` and resolved locally, never returned.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::trace;

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Stage document names an unknown `$` stage
    UnknownStage,
    /// Filter uses an unsupported operator
    UnknownOperator,
    /// Group uses an unsupported accumulator
    UnknownAccumulator,
    /// Stage document has the wrong shape
    MalformedStage,
    /// Filter document has the wrong shape
    MalformedFilter,
    /// `$limit` below zero
    NegativeLimit,
    /// `$skip` below zero
    NegativeSkip,
    /// `$project` selects no fields
    EmptyProjection,
    /// Sort keys missing or direction not 1/-1
    InvalidSort,
    /// Empty, reserved or duplicate field name
    InvalidFieldName,
}

impl ConfigErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigErrorCode::UnknownStage => "UNKNOWN_STAGE",
            ConfigErrorCode::UnknownOperator => "UNKNOWN_OPERATOR",
            ConfigErrorCode::UnknownAccumulator => "UNKNOWN_ACCUMULATOR",
            ConfigErrorCode::MalformedStage => "MALFORMED_STAGE",
            ConfigErrorCode::MalformedFilter => "MALFORMED_FILTER",
            ConfigErrorCode::NegativeLimit => "NEGATIVE_LIMIT",
            ConfigErrorCode::NegativeSkip => "NEGATIVE_SKIP",
            ConfigErrorCode::EmptyProjection => "EMPTY_PROJECTION",
            ConfigErrorCode::InvalidSort => "INVALID_SORT",
            ConfigErrorCode::InvalidFieldName => "INVALID_FIELD_NAME",
        }
    }
}

impl fmt::Display for ConfigErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A pipeline or filter that cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}{}", stage_suffix(.stage))]
pub struct ConfigurationError {
    code: ConfigErrorCode,
    message: String,
    stage: Option<usize>,
}

fn stage_suffix(stage: &Option<usize>) -> String {
    match stage {
        Some(index) => format!(" (stage {})", index),
        None => String::new(),
    }
}

impl ConfigurationError {
    /// Create an error with the given code
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stage: None,
        }
    }

    pub fn unknown_stage(name: &str) -> Self {
        Self::new(
            ConfigErrorCode::UnknownStage,
            format!("Unknown stage operator '{}'", name),
        )
    }

    pub fn unknown_operator(name: &str) -> Self {
        Self::new(
            ConfigErrorCode::UnknownOperator,
            format!("Unsupported filter operator '{}'", name),
        )
    }

    pub fn unknown_accumulator(name: &str) -> Self {
        Self::new(
            ConfigErrorCode::UnknownAccumulator,
            format!("Unsupported accumulator '{}'", name),
        )
    }

    pub fn malformed_stage(reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::MalformedStage, reason)
    }

    pub fn malformed_filter(reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::MalformedFilter, reason)
    }

    pub fn negative_limit(n: i64) -> Self {
        Self::new(
            ConfigErrorCode::NegativeLimit,
            format!("$limit must not be negative, got {}", n),
        )
    }

    pub fn negative_skip(n: i64) -> Self {
        Self::new(
            ConfigErrorCode::NegativeSkip,
            format!("$skip must not be negative, got {}", n),
        )
    }

    pub fn empty_projection() -> Self {
        Self::new(
            ConfigErrorCode::EmptyProjection,
            "$project must select at least one field",
        )
    }

    pub fn invalid_sort(reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::InvalidSort, reason)
    }

    pub fn invalid_field_name(name: &str, reason: &str) -> Self {
        Self::new(
            ConfigErrorCode::InvalidFieldName,
            format!("Invalid field name '{}': {}", name, reason),
        )
    }

    /// Attach the index of the stage that failed validation.
    ///
    /// An index already present is kept, so nested parsers can tag early.
    pub fn at_stage(mut self, index: usize) -> Self {
        if self.stage.is_none() {
            self.stage = Some(index);
        }
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the failing stage index, if known
    pub fn stage(&self) -> Option<usize> {
        self.stage
    }
}

/// Result type for pipeline and filter construction
pub type PipelineResult<T> = Result<T, ConfigurationError>;

/// Where a soft type mismatch was encountered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchSite {
    /// Filter comparison against a literal of another type
    Comparison,
    /// Numeric accumulator saw a non-numeric value
    Accumulator,
}

impl MismatchSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchSite::Comparison => "comparison",
            MismatchSite::Accumulator => "accumulator",
        }
    }
}

/// Tally of soft data type mismatches seen during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeMismatches {
    comparisons: usize,
    accumulators: usize,
}

impl TypeMismatches {
    /// Record one mismatch on `field`
    pub fn record(&mut self, site: MismatchSite, field: &str) {
        trace!(site = site.as_str(), field, "data type mismatch");
        match site {
            MismatchSite::Comparison => self.comparisons += 1,
            MismatchSite::Accumulator => self.accumulators += 1,
        }
    }

    pub fn comparisons(&self) -> usize {
        self.comparisons
    }

    pub fn accumulators(&self) -> usize {
        self.accumulators
    }

    pub fn total(&self) -> usize {
        self.comparisons + self.accumulators
    }
}
