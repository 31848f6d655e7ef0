//! Pipeline stage definitions
//!
//! Stages are plain data. `Stage::validate` performs every structural check
//! so that a built pipeline can run without failing.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Number, Value};

use crate::errors::{ConfigurationError, PipelineResult};
use crate::filter::Filter;
use crate::record::Record;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Maps the shell encoding (1 / -1)
    pub fn from_i64(n: i64) -> Option<Self> {
        match n {
            1 => Some(SortDirection::Ascending),
            -1 => Some(SortDirection::Descending),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

/// Group key selector
#[derive(Debug, Clone, PartialEq)]
pub enum KeySelector {
    /// `"$field"`
    Field(String),
    /// Constant key; `null` groups everything together
    Literal(Value),
    /// `{ "name": <selector>, ... }`
    Compound(Vec<(String, KeySelector)>),
}

impl KeySelector {
    pub fn field(path: impl Into<String>) -> Self {
        KeySelector::Field(path.into())
    }

    /// Evaluates the key for one record. Missing fields resolve to null.
    pub fn resolve(&self, record: &Record) -> Value {
        match self {
            KeySelector::Field(path) => record.lookup(path).cloned().unwrap_or(Value::Null),
            KeySelector::Literal(value) => value.clone(),
            KeySelector::Compound(parts) => Value::Object(
                parts
                    .iter()
                    .map(|(name, selector)| (name.clone(), selector.resolve(record)))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    fn validate(&self) -> PipelineResult<()> {
        match self {
            KeySelector::Field(path) => check_path(path),
            KeySelector::Literal(_) => Ok(()),
            KeySelector::Compound(parts) => {
                let mut seen = HashSet::new();
                for (name, selector) in parts {
                    check_output_name(name)?;
                    if !seen.insert(name.as_str()) {
                        return Err(ConfigurationError::invalid_field_name(
                            name,
                            "duplicate key in group _id",
                        ));
                    }
                    selector.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Field(path) => write!(f, "${}", path),
            KeySelector::Literal(value) => write!(f, "{}", value),
            KeySelector::Compound(parts) => {
                write!(f, "{{")?;
                for (i, (name, selector)) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, selector)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Operand of `$sum`
#[derive(Debug, Clone, PartialEq)]
pub enum SumOperand {
    /// Sum a numeric field
    Field(String),
    /// Add a constant once per record (`$sum: 1` counts)
    Constant(Number),
}

/// Accumulator operators
#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorOp {
    /// Number of records in the group
    Count,
    Sum(SumOperand),
    Avg(String),
    Max(String),
    Min(String),
}

impl AccumulatorOp {
    pub fn op_name(&self) -> &'static str {
        match self {
            AccumulatorOp::Count => "$count",
            AccumulatorOp::Sum(_) => "$sum",
            AccumulatorOp::Avg(_) => "$avg",
            AccumulatorOp::Max(_) => "$max",
            AccumulatorOp::Min(_) => "$min",
        }
    }

    fn validate(&self) -> PipelineResult<()> {
        match self {
            AccumulatorOp::Count | AccumulatorOp::Sum(SumOperand::Constant(_)) => Ok(()),
            AccumulatorOp::Sum(SumOperand::Field(path))
            | AccumulatorOp::Avg(path)
            | AccumulatorOp::Max(path)
            | AccumulatorOp::Min(path) => check_path(path),
        }
    }
}

impl fmt::Display for AccumulatorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccumulatorOp::Count => write!(f, "$count"),
            AccumulatorOp::Sum(SumOperand::Constant(n)) => write!(f, "$sum({})", n),
            AccumulatorOp::Sum(SumOperand::Field(path))
            | AccumulatorOp::Avg(path)
            | AccumulatorOp::Max(path)
            | AccumulatorOp::Min(path) => write!(f, "{}(${})", self.op_name(), path),
        }
    }
}

/// A named aggregation in a group stage
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Output field name
    pub output: String,
    pub op: AccumulatorOp,
}

impl Aggregation {
    pub fn new(output: impl Into<String>, op: AccumulatorOp) -> Self {
        Self {
            output: output.into(),
            op,
        }
    }

    pub fn count(output: impl Into<String>) -> Self {
        Self::new(output, AccumulatorOp::Count)
    }

    pub fn sum(output: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(output, AccumulatorOp::Sum(SumOperand::Field(field.into())))
    }

    pub fn sum_constant(output: impl Into<String>, n: impl Into<Number>) -> Self {
        Self::new(output, AccumulatorOp::Sum(SumOperand::Constant(n.into())))
    }

    pub fn avg(output: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(output, AccumulatorOp::Avg(field.into()))
    }

    pub fn max(output: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(output, AccumulatorOp::Max(field.into()))
    }

    pub fn min(output: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(output, AccumulatorOp::Min(field.into()))
    }
}

/// `$group` specification
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Key selector, output as `_id`
    pub key: KeySelector,
    /// Aggregations in output order
    pub aggregations: Vec<Aggregation>,
}

impl GroupSpec {
    pub fn new(key: KeySelector, aggregations: Vec<Aggregation>) -> Self {
        Self { key, aggregations }
    }

    fn validate(&self) -> PipelineResult<()> {
        self.key.validate()?;

        let mut seen = HashSet::new();
        for aggregation in &self.aggregations {
            if aggregation.output == "_id" {
                return Err(ConfigurationError::invalid_field_name(
                    "_id",
                    "reserved for the group key",
                ));
            }
            check_output_name(&aggregation.output)?;
            if !seen.insert(aggregation.output.as_str()) {
                return Err(ConfigurationError::invalid_field_name(
                    &aggregation.output,
                    "duplicate aggregation name",
                ));
            }
            aggregation.op.validate()?;
        }
        Ok(())
    }
}

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep records matching the filter
    Match(Filter),
    /// Partition by key and aggregate
    Group(GroupSpec),
    /// Keep only the listed fields
    Project(Vec<String>),
    /// Stable sort by one or more keys
    Sort(Vec<SortKey>),
    /// Keep the first n records
    Limit(i64),
    /// Drop the first n records
    Skip(i64),
    /// Replace the sequence with `{ <name>: <count> }`
    Count(String),
}

impl Stage {
    pub fn filter(filter: Filter) -> Self {
        Stage::Match(filter)
    }

    pub fn group(key: KeySelector, aggregations: Vec<Aggregation>) -> Self {
        Stage::Group(GroupSpec::new(key, aggregations))
    }

    pub fn project<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Stage::Project(fields.into_iter().map(Into::into).collect())
    }

    pub fn sort(field: impl Into<String>, direction: SortDirection) -> Self {
        Stage::Sort(vec![SortKey {
            field: field.into(),
            direction,
        }])
    }

    /// Stage name as written in a pipeline document
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "$match",
            Stage::Group(_) => "$group",
            Stage::Project(_) => "$project",
            Stage::Sort(_) => "$sort",
            Stage::Limit(_) => "$limit",
            Stage::Skip(_) => "$skip",
            Stage::Count(_) => "$count",
        }
    }

    /// Structural validation. Runs before any record is processed.
    pub fn validate(&self) -> PipelineResult<()> {
        match self {
            Stage::Match(filter) => filter
                .comparisons()
                .into_iter()
                .try_for_each(|c| check_path(&c.field)),
            Stage::Group(spec) => spec.validate(),
            Stage::Project(fields) => {
                if fields.is_empty() {
                    return Err(ConfigurationError::empty_projection());
                }
                fields.iter().try_for_each(|f| check_path(f))
            }
            Stage::Sort(keys) => {
                if keys.is_empty() {
                    return Err(ConfigurationError::invalid_sort(
                        "$sort requires at least one key",
                    ));
                }
                keys.iter().try_for_each(|k| check_path(&k.field))
            }
            Stage::Limit(n) if *n < 0 => Err(ConfigurationError::negative_limit(*n)),
            Stage::Skip(n) if *n < 0 => Err(ConfigurationError::negative_skip(*n)),
            Stage::Limit(_) | Stage::Skip(_) => Ok(()),
            Stage::Count(name) => check_output_name(name),
        }
    }
}

/// Field paths: non-empty dotted segments, no leading `$`
fn check_path(path: &str) -> PipelineResult<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(ConfigurationError::invalid_field_name(
            path,
            "field paths must be non-empty dotted names",
        ));
    }
    if path.starts_with('$') {
        return Err(ConfigurationError::invalid_field_name(
            path,
            "field paths must not start with '$'",
        ));
    }
    Ok(())
}

/// Output names: a single non-empty segment, no leading `$`
fn check_output_name(name: &str) -> PipelineResult<()> {
    if name.is_empty() || name.starts_with('$') || name.contains('.') {
        return Err(ConfigurationError::invalid_field_name(
            name,
            "output names must be non-empty, without '.' or a leading '$'",
        ));
    }
    Ok(())
}
