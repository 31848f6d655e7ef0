//! Predicate evaluation
//!
//! Evaluates a filter tree against one record. Never fails: type
//! mismatches resolve per operator and are tallied as soft mismatches.
//!
//! - Absent fields are treated as null
//! - Mismatched types never satisfy `$eq`, `$gt`, `$gte`, `$lt`, `$lte`
//! - Mismatched types always satisfy `$ne`
//! - `$and` / `$or` short-circuit in child order

use std::cmp::Ordering;

use serde_json::Value;

use crate::errors::{MismatchSite, TypeMismatches};
use crate::record::value::{same_type, scalar_cmp, values_equal};
use crate::record::Record;

use super::ast::{CompareOp, Comparison, Filter};

static NULL: Value = Value::Null;

/// Evaluates filters against records
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a record matches the filter
    pub fn matches(record: &Record, filter: &Filter) -> bool {
        let mut mismatches = TypeMismatches::default();
        Self::matches_counting(record, filter, &mut mismatches)
    }

    /// Checks if a record matches the filter, tallying type mismatches
    pub fn matches_counting(
        record: &Record,
        filter: &Filter,
        mismatches: &mut TypeMismatches,
    ) -> bool {
        match filter {
            Filter::Comparison(comparison) => Self::matches_comparison(record, comparison, mismatches),
            Filter::And(children) => children
                .iter()
                .all(|child| Self::matches_counting(record, child, mismatches)),
            Filter::Or(children) => children
                .iter()
                .any(|child| Self::matches_counting(record, child, mismatches)),
            Filter::Nor(children) => !children
                .iter()
                .any(|child| Self::matches_counting(record, child, mismatches)),
        }
    }

    fn matches_comparison(
        record: &Record,
        comparison: &Comparison,
        mismatches: &mut TypeMismatches,
    ) -> bool {
        let actual = record.lookup(&comparison.field);
        Self::apply(&comparison.field, &comparison.op, actual, mismatches)
    }

    fn apply(
        field: &str,
        op: &CompareOp,
        actual: Option<&Value>,
        mismatches: &mut TypeMismatches,
    ) -> bool {
        match op {
            CompareOp::Exists(flag) => actual.is_some() == *flag,
            CompareOp::Not(inner) => !Self::apply(field, inner, actual, mismatches),
            CompareOp::In(candidates) => {
                let value = actual.unwrap_or(&NULL);
                candidates.iter().any(|c| values_equal(value, c))
            }
            CompareOp::Nin(candidates) => {
                let value = actual.unwrap_or(&NULL);
                !candidates.iter().any(|c| values_equal(value, c))
            }
            CompareOp::Regex(pattern) => match actual {
                Some(Value::String(text)) => pattern.is_match(text),
                Some(Value::Null) | None => false,
                Some(_) => {
                    mismatches.record(MismatchSite::Comparison, field);
                    false
                }
            },
            CompareOp::Eq(expected) => {
                Self::typed(field, actual, expected, mismatches, false, values_equal)
            }
            CompareOp::Ne(expected) => {
                Self::typed(field, actual, expected, mismatches, true, |a, b| {
                    !values_equal(a, b)
                })
            }
            CompareOp::Gt(bound) => Self::ordered(field, actual, bound, mismatches, |o| {
                o == Ordering::Greater
            }),
            CompareOp::Gte(bound) => Self::ordered(field, actual, bound, mismatches, |o| {
                o != Ordering::Less
            }),
            CompareOp::Lt(bound) => Self::ordered(field, actual, bound, mismatches, |o| {
                o == Ordering::Less
            }),
            CompareOp::Lte(bound) => Self::ordered(field, actual, bound, mismatches, |o| {
                o != Ordering::Greater
            }),
        }
    }

    /// Applies `check` when the types agree, else returns `on_mismatch`.
    ///
    /// A missing field is compared as null and is not counted as a mismatch.
    fn typed(
        field: &str,
        actual: Option<&Value>,
        literal: &Value,
        mismatches: &mut TypeMismatches,
        on_mismatch: bool,
        check: impl Fn(&Value, &Value) -> bool,
    ) -> bool {
        let value = actual.unwrap_or(&NULL);
        if !same_type(value, literal) {
            if actual.is_some() {
                mismatches.record(MismatchSite::Comparison, field);
            }
            return on_mismatch;
        }
        check(value, literal)
    }

    /// Range comparison. Sequences and records have no order and never match.
    fn ordered(
        field: &str,
        actual: Option<&Value>,
        bound: &Value,
        mismatches: &mut TypeMismatches,
        accept: impl Fn(Ordering) -> bool,
    ) -> bool {
        Self::typed(field, actual, bound, mismatches, false, |a, b| {
            scalar_cmp(a, b).is_some_and(&accept)
        })
    }
}

/// Evaluates `filter` against `record`
pub fn evaluate(record: &Record, filter: &Filter) -> bool {
    PredicateFilter::matches(record, filter)
}
