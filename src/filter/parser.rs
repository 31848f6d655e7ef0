//! Filter document parser
//!
//! Parses shell-style JSON filters into a `Filter` tree:
//!
//! ```text
//! { "city": "Delhi" }                              implicit $eq
//! { "marks": { "$gt": 70 } }                       operator object
//! { "age": { "$gte": 20, "$lt": 23 } }             operators ANDed
//! { "$and": [ {...}, {...} ] }                     logical node
//! ```
//!
//! Unsupported operators fail here, at build time, never during evaluation.

use regex::RegexBuilder;
use serde_json::{Map, Value};

use crate::errors::{ConfigurationError, PipelineResult};

use super::ast::{CompareOp, Comparison, Filter, Pattern};

/// Parse a filter document into a `Filter` tree
pub fn parse_filter(json: &Value) -> PipelineResult<Filter> {
    let map = json
        .as_object()
        .ok_or_else(|| ConfigurationError::malformed_filter("filter must be an object"))?;

    let mut filters = Vec::with_capacity(map.len());
    for (key, value) in map {
        let filter = match key.as_str() {
            "$and" => Filter::And(parse_children(key, value)?),
            "$or" => Filter::Or(parse_children(key, value)?),
            "$nor" => Filter::Nor(parse_children(key, value)?),
            op if op.starts_with('$') => return Err(ConfigurationError::unknown_operator(op)),
            field => parse_field(field, value)?,
        };
        filters.push(filter);
    }

    if filters.len() == 1 {
        Ok(filters.remove(0))
    } else {
        Ok(Filter::And(filters))
    }
}

fn parse_children(op: &str, value: &Value) -> PipelineResult<Vec<Filter>> {
    let items = value.as_array().ok_or_else(|| {
        ConfigurationError::malformed_filter(format!("{} value must be an array", op))
    })?;
    items.iter().map(parse_filter).collect()
}

fn parse_field(field: &str, value: &Value) -> PipelineResult<Filter> {
    if field.is_empty() {
        return Err(ConfigurationError::malformed_filter("empty field name in filter"));
    }

    let ops = match value {
        Value::Object(map) if is_operator_object(map)? => map,
        // Shorthand: { field: literal } means $eq
        _ => return Ok(Comparison::eq(field, value.clone()).into()),
    };

    let mut comparisons = Vec::with_capacity(ops.len());
    for (name, operand) in ops {
        match name.as_str() {
            "$options" => {
                if !ops.contains_key("$regex") {
                    return Err(ConfigurationError::malformed_filter(
                        "$options requires $regex",
                    ));
                }
            }
            "$regex" => {
                let options = regex_options(ops)?;
                comparisons.push(Comparison::new(field, parse_regex(operand, options)?));
            }
            _ => comparisons.push(Comparison::new(field, parse_operator(name, operand)?)),
        }
    }

    if comparisons.len() == 1 {
        Ok(comparisons.remove(0).into())
    } else {
        Ok(Filter::And(comparisons.into_iter().map(Filter::from).collect()))
    }
}

/// An object whose keys all start with `$` holds operators; one with none
/// is a literal sub-record. Mixing the two is rejected.
fn is_operator_object(map: &Map<String, Value>) -> PipelineResult<bool> {
    let operators = map.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return Ok(false);
    }
    if operators != map.len() {
        return Err(ConfigurationError::malformed_filter(
            "cannot mix operators and field names in one filter object",
        ));
    }
    Ok(true)
}

fn parse_operator(name: &str, value: &Value) -> PipelineResult<CompareOp> {
    match name {
        "$eq" => Ok(CompareOp::Eq(value.clone())),
        "$ne" => Ok(CompareOp::Ne(value.clone())),
        "$gt" => Ok(CompareOp::Gt(value.clone())),
        "$gte" => Ok(CompareOp::Gte(value.clone())),
        "$lt" => Ok(CompareOp::Lt(value.clone())),
        "$lte" => Ok(CompareOp::Lte(value.clone())),
        "$in" => Ok(CompareOp::In(expect_array(name, value)?)),
        "$nin" => Ok(CompareOp::Nin(expect_array(name, value)?)),
        "$exists" => {
            let flag = value.as_bool().ok_or_else(|| {
                ConfigurationError::malformed_filter("$exists expects a boolean")
            })?;
            Ok(CompareOp::Exists(flag))
        }
        "$not" => parse_not(value),
        other => Err(ConfigurationError::unknown_operator(other)),
    }
}

fn parse_not(value: &Value) -> PipelineResult<CompareOp> {
    let inner = value
        .as_object()
        .ok_or_else(|| ConfigurationError::malformed_filter("$not expects an operator object"))?;

    if inner.contains_key("$options") && !inner.contains_key("$regex") {
        return Err(ConfigurationError::malformed_filter("$options requires $regex"));
    }

    let mut entries = inner.iter().filter(|(k, _)| k.as_str() != "$options");
    let (name, operand) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            return Err(ConfigurationError::malformed_filter(
                "$not expects exactly one operator",
            ))
        }
    };

    let op = match name.as_str() {
        "$not" => {
            return Err(ConfigurationError::malformed_filter("$not cannot be nested"));
        }
        "$regex" => parse_regex(operand, regex_options(inner)?)?,
        other => parse_operator(other, operand)?,
    };
    Ok(CompareOp::Not(Box::new(op)))
}

fn expect_array(name: &str, value: &Value) -> PipelineResult<Vec<Value>> {
    value
        .as_array()
        .cloned()
        .ok_or_else(|| ConfigurationError::malformed_filter(format!("{} expects an array", name)))
}

fn regex_options(ops: &Map<String, Value>) -> PipelineResult<&str> {
    match ops.get("$options") {
        None => Ok(""),
        Some(Value::String(options)) => Ok(options),
        Some(_) => Err(ConfigurationError::malformed_filter(
            "$options must be a string",
        )),
    }
}

fn parse_regex(value: &Value, options: &str) -> PipelineResult<CompareOp> {
    let source = value
        .as_str()
        .ok_or_else(|| ConfigurationError::malformed_filter("$regex expects a string"))?;

    let mut builder = RegexBuilder::new(source);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(ConfigurationError::malformed_filter(format!(
                    "unsupported $regex option '{}'",
                    other
                )))
            }
        };
    }

    let regex = builder.build().map_err(|e| {
        ConfigurationError::malformed_filter(format!("invalid $regex '{}': {}", source, e))
    })?;
    Ok(CompareOp::Regex(Pattern::new(source, options, regex)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigErrorCode;
    use serde_json::json;

    #[test]
    fn test_implicit_eq() {
        let filter = parse_filter(&json!({"city": "Delhi"})).unwrap();
        assert_eq!(filter, Comparison::eq("city", json!("Delhi")).into());
    }

    #[test]
    fn test_literal_sub_record_is_eq() {
        let filter = parse_filter(&json!({"address": {"city": "Delhi"}})).unwrap();
        assert_eq!(
            filter,
            Comparison::eq("address", json!({"city": "Delhi"})).into()
        );
    }

    #[test]
    fn test_operator_object() {
        let filter = parse_filter(&json!({"marks": {"$gt": 70}})).unwrap();
        assert_eq!(filter, Comparison::gt("marks", json!(70)).into());
    }

    #[test]
    fn test_several_operators_on_one_field_are_anded() {
        let filter = parse_filter(&json!({"age": {"$gte": 20, "$lt": 23}})).unwrap();
        assert_eq!(
            filter,
            Filter::and(vec![
                Comparison::gte("age", json!(20)).into(),
                Comparison::lt("age", json!(23)).into(),
            ])
        );
    }

    #[test]
    fn test_several_top_level_keys_are_anded_in_order() {
        let filter = parse_filter(&json!({"city": "Delhi", "age": {"$lt": 22}})).unwrap();
        assert_eq!(
            filter,
            Filter::and(vec![
                Comparison::eq("city", json!("Delhi")).into(),
                Comparison::lt("age", json!(22)).into(),
            ])
        );
    }

    #[test]
    fn test_logical_operators() {
        let filter = parse_filter(&json!({
            "$or": [{"marks": {"$gt": 90}}, {"$nor": [{"city": "Delhi"}]}]
        }))
        .unwrap();
        assert_eq!(
            filter,
            Filter::or(vec![
                Comparison::gt("marks", json!(90)).into(),
                Filter::nor(vec![Comparison::eq("city", json!("Delhi")).into()]),
            ])
        );
    }

    #[test]
    fn test_empty_filter_matches_all() {
        assert_eq!(parse_filter(&json!({})).unwrap(), Filter::all());
        assert_eq!(parse_filter(&json!({"$and": []})).unwrap(), Filter::and(vec![]));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let err = parse_filter(&json!({"marks": {"$between": [1, 2]}})).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::UnknownOperator);

        let err = parse_filter(&json!({"$xor": []})).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::UnknownOperator);
    }

    #[test]
    fn test_malformed_filters_rejected() {
        let cases = [
            json!([1, 2]),
            json!({"$and": {"a": 1}}),
            json!({"city": {"$in": "Delhi"}}),
            json!({"city": {"$exists": 1}}),
            json!({"city": {"$eq": "x", "name": "y"}}),
            json!({"marks": {"$not": {"$not": {"$lt": 1}}}}),
            json!({"marks": {"$not": {"$lt": 1, "$gt": 5}}}),
            json!({"name": {"$options": "i"}}),
            json!({"marks": {"$not": {"$lt": 1, "$options": "i"}}}),
            json!({"name": {"$regex": "("}}),
            json!({"name": {"$regex": "a", "$options": "q"}}),
        ];
        for case in cases {
            let err = parse_filter(&case).unwrap_err();
            assert_eq!(err.code(), ConfigErrorCode::MalformedFilter, "case: {}", case);
        }
    }

    #[test]
    fn test_regex_with_options() {
        let filter = parse_filter(&json!({"name": {"$regex": "^a", "$options": "i"}})).unwrap();
        match filter {
            Filter::Comparison(Comparison {
                op: CompareOp::Regex(pattern),
                ..
            }) => {
                assert!(pattern.is_match("Alice"));
                assert!(!pattern.is_match("Bob"));
            }
            other => panic!("expected regex comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_not_wraps_single_operator() {
        let filter = parse_filter(&json!({"marks": {"$not": {"$lt": 60}}})).unwrap();
        assert_eq!(
            filter,
            Comparison::new("marks", CompareOp::Not(Box::new(CompareOp::Lt(json!(60))))).into()
        );
    }

    #[test]
    fn test_not_regex_keeps_options() {
        let filter = parse_filter(&json!({"name": {"$not": {"$regex": "^a", "$options": "i"}}})).unwrap();
        match filter {
            Filter::Comparison(Comparison {
                op: CompareOp::Not(inner),
                ..
            }) => match *inner {
                CompareOp::Regex(pattern) => {
                    assert_eq!(pattern.options(), "i");
                    assert!(pattern.is_match("Alice"));
                }
                other => panic!("unexpected op: {:?}", other),
            },
            other => panic!("unexpected filter: {:?}", other),
        }
    }
}
