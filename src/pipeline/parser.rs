//! Pipeline document parser
//!
//! A pipeline is a JSON array of stage documents, each an object with
//! exactly one `$` key:
//!
//! ```text
//! [
//!   { "$match": { "marks": { "$gt": 70 } } },
//!   { "$group": { "_id": "$city", "avg": { "$avg": "$marks" } } },
//!   { "$sort": { "avg": -1 } },
//!   { "$limit": 2 }
//! ]
//! ```

use serde_json::{Map, Value};

use crate::errors::{ConfigurationError, PipelineResult};
use crate::filter::parse_filter;

use super::stage::{
    AccumulatorOp, Aggregation, GroupSpec, KeySelector, SortDirection, SortKey, Stage, SumOperand,
};

/// Parses a pipeline document into stages. Errors carry the stage index.
pub fn parse_pipeline(value: &Value) -> PipelineResult<Vec<Stage>> {
    let items = value
        .as_array()
        .ok_or_else(|| ConfigurationError::malformed_stage("pipeline must be an array of stages"))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_stage(item).map_err(|e| e.at_stage(index)))
        .collect()
}

/// Parses one stage document
pub fn parse_stage(value: &Value) -> PipelineResult<Stage> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigurationError::malformed_stage("stage must be an object"))?;

    let mut entries = obj.iter();
    let (op, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ConfigurationError::malformed_stage(
                "stage must have exactly one operator",
            ))
        }
    };

    match op.as_str() {
        "$match" => Ok(Stage::Match(parse_filter(body)?)),
        "$group" => Ok(Stage::Group(parse_group(body)?)),
        "$project" => Ok(Stage::Project(parse_project(body)?)),
        "$sort" => Ok(Stage::Sort(parse_sort(body)?)),
        "$limit" => Ok(Stage::Limit(parse_integer(op, body)?)),
        "$skip" => Ok(Stage::Skip(parse_integer(op, body)?)),
        "$count" => {
            let name = body
                .as_str()
                .ok_or_else(|| ConfigurationError::malformed_stage("$count must be a string"))?;
            Ok(Stage::Count(name.to_string()))
        }
        other => Err(ConfigurationError::unknown_stage(other)),
    }
}

fn parse_group(value: &Value) -> PipelineResult<GroupSpec> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigurationError::malformed_stage("$group must be an object"))?;

    let key = obj
        .get("_id")
        .ok_or_else(|| ConfigurationError::malformed_stage("$group requires an _id"))?;
    let key = parse_key_selector(key)?;

    let aggregations = obj
        .iter()
        .filter(|(name, _)| name.as_str() != "_id")
        .map(|(name, spec)| Ok(Aggregation::new(name.as_str(), parse_accumulator(name, spec)?)))
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok(GroupSpec::new(key, aggregations))
}

fn parse_key_selector(value: &Value) -> PipelineResult<KeySelector> {
    match value {
        Value::String(s) if s.starts_with('$') => Ok(KeySelector::Field(field_ref(s))),
        Value::Object(parts) => Ok(KeySelector::Compound(
            parts
                .iter()
                .map(|(name, part)| Ok((name.clone(), parse_key_selector(part)?)))
                .collect::<PipelineResult<Vec<_>>>()?,
        )),
        literal => Ok(KeySelector::Literal(literal.clone())),
    }
}

fn parse_accumulator(name: &str, value: &Value) -> PipelineResult<AccumulatorOp> {
    let (op, operand) = single_entry(value).ok_or_else(|| {
        ConfigurationError::malformed_stage(format!(
            "aggregation '{}' must be an object with one accumulator",
            name
        ))
    })?;

    match op.as_str() {
        "$count" => match operand {
            Value::Object(args) if args.is_empty() => Ok(AccumulatorOp::Count),
            _ => Err(ConfigurationError::malformed_stage(
                "$count accumulator takes an empty object",
            )),
        },
        "$sum" => match operand {
            Value::Number(n) => Ok(AccumulatorOp::Sum(SumOperand::Constant(n.clone()))),
            Value::String(s) if s.starts_with('$') => {
                Ok(AccumulatorOp::Sum(SumOperand::Field(field_ref(s))))
            }
            _ => Err(ConfigurationError::malformed_stage(
                "$sum expects a number or a field reference",
            )),
        },
        "$avg" => Ok(AccumulatorOp::Avg(expect_field_ref(op, operand)?)),
        "$max" => Ok(AccumulatorOp::Max(expect_field_ref(op, operand)?)),
        "$min" => Ok(AccumulatorOp::Min(expect_field_ref(op, operand)?)),
        other => Err(ConfigurationError::unknown_accumulator(other)),
    }
}

fn parse_project(value: &Value) -> PipelineResult<Vec<String>> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigurationError::malformed_stage("$project must be an object"))?;

    obj.iter()
        .map(|(field, flag)| {
            let include = match flag {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64() != Some(0.0),
                _ => {
                    return Err(ConfigurationError::malformed_stage(format!(
                        "$project value for '{}' must be 1/true",
                        field
                    )))
                }
            };
            if !include {
                return Err(ConfigurationError::malformed_stage(format!(
                    "exclusion of '{}' is not supported; list the fields to keep",
                    field
                )));
            }
            Ok(field.clone())
        })
        .collect()
}

fn parse_sort(value: &Value) -> PipelineResult<Vec<SortKey>> {
    let obj = value
        .as_object()
        .ok_or_else(|| ConfigurationError::invalid_sort("$sort must be an object"))?;

    obj.iter()
        .map(|(field, dir)| {
            let direction = dir
                .as_i64()
                .and_then(SortDirection::from_i64)
                .ok_or_else(|| {
                    ConfigurationError::invalid_sort(format!(
                        "sort direction for '{}' must be 1 or -1",
                        field
                    ))
                })?;
            Ok(SortKey {
                field: field.clone(),
                direction,
            })
        })
        .collect()
}

fn parse_integer(op: &str, value: &Value) -> PipelineResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| ConfigurationError::malformed_stage(format!("{} must be an integer", op)))
}

fn single_entry(value: &Value) -> Option<(&String, &Value)> {
    let obj: &Map<String, Value> = value.as_object()?;
    let mut entries = obj.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Some(entry),
        _ => None,
    }
}

fn expect_field_ref(op: &str, value: &Value) -> PipelineResult<String> {
    match value {
        Value::String(s) if s.starts_with('$') => Ok(field_ref(s)),
        _ => Err(ConfigurationError::malformed_stage(format!(
            "{} expects a field reference like \"$marks\"",
            op
        ))),
    }
}

/// Strips the single `$` marking a field reference
fn field_ref(s: &str) -> String {
    s.strip_prefix('$').unwrap_or(s).to_string()
}
