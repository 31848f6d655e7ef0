//! Per-group accumulator state
//!
//! Missing and null values are skipped silently. Any other non-numeric
//! value is skipped and tallied as a type mismatch. Every reduction here is
//! order independent (up to floating-point rounding).

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::errors::{MismatchSite, TypeMismatches};
use crate::record::value::compare_numbers;
use crate::record::Record;

use super::stage::{AccumulatorOp, SumOperand};

/// Running numeric total.
///
/// Integer inputs accumulate exactly in an `i128`, so the result does not
/// depend on input order. Any float input switches to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Total {
    Int(i128),
    Float(f64),
}

impl Total {
    fn add(self, n: &Number) -> Self {
        let exact = n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from));
        match (self, exact) {
            (Total::Int(total), Some(i)) => match total.checked_add(i) {
                Some(sum) => Total::Int(sum),
                None => Total::Float(total as f64 + i as f64),
            },
            (total, _) => Total::Float(total.as_f64() + n.as_f64().unwrap_or(0.0)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Total::Int(i) => i as f64,
            Total::Float(f) => f,
        }
    }

    /// Integral totals outside the JSON integer range become floats
    fn into_value(self) -> Value {
        match self {
            Total::Int(i) => {
                if let Ok(small) = i64::try_from(i) {
                    Value::from(small)
                } else if let Ok(large) = u64::try_from(i) {
                    Value::from(large)
                } else {
                    float_value(i as f64)
                }
            }
            Total::Float(f) => float_value(f),
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    Count(u64),
    Sum(Total),
    Avg { total: f64, count: u64 },
    Extremum(Option<Number>),
}

/// Accumulator for one aggregation of one group
#[derive(Debug, Clone)]
pub(crate) struct GroupAccumulator<'a> {
    op: &'a AccumulatorOp,
    state: State,
}

impl<'a> GroupAccumulator<'a> {
    pub(crate) fn new(op: &'a AccumulatorOp) -> Self {
        let state = match op {
            AccumulatorOp::Count => State::Count(0),
            AccumulatorOp::Sum(_) => State::Sum(Total::Int(0)),
            AccumulatorOp::Avg(_) => State::Avg {
                total: 0.0,
                count: 0,
            },
            AccumulatorOp::Max(_) | AccumulatorOp::Min(_) => State::Extremum(None),
        };
        Self { op, state }
    }

    /// Folds one record into the running state
    pub(crate) fn accumulate(&mut self, record: &Record, mismatches: &mut TypeMismatches) {
        match (self.op, &mut self.state) {
            (AccumulatorOp::Count, State::Count(n)) => *n += 1,
            (AccumulatorOp::Sum(SumOperand::Constant(c)), State::Sum(total)) => {
                *total = total.add(c);
            }
            (AccumulatorOp::Sum(SumOperand::Field(field)), State::Sum(total)) => {
                if let Some(n) = numeric(record, field, mismatches) {
                    *total = total.add(n);
                }
            }
            (AccumulatorOp::Avg(field), State::Avg { total, count }) => {
                if let Some(n) = numeric(record, field, mismatches) {
                    *total += n.as_f64().unwrap_or(0.0);
                    *count += 1;
                }
            }
            (AccumulatorOp::Max(field), State::Extremum(best)) => {
                if let Some(n) = numeric(record, field, mismatches) {
                    replace_if(best, n, Ordering::Greater);
                }
            }
            (AccumulatorOp::Min(field), State::Extremum(best)) => {
                if let Some(n) = numeric(record, field, mismatches) {
                    replace_if(best, n, Ordering::Less);
                }
            }
            // state always matches the op it was built from
            _ => {}
        }
    }

    /// Final value for the group
    pub(crate) fn finish(self) -> Value {
        match self.state {
            State::Count(n) => Value::from(n),
            State::Sum(total) => total.into_value(),
            State::Avg { count: 0, .. } => Value::Null,
            State::Avg { total, count } => float_value(total / count as f64),
            State::Extremum(best) => best.map(Value::Number).unwrap_or(Value::Null),
        }
    }
}

fn numeric<'r>(
    record: &'r Record,
    field: &str,
    mismatches: &mut TypeMismatches,
) -> Option<&'r Number> {
    match record.lookup(field) {
        Some(Value::Number(n)) => Some(n),
        None | Some(Value::Null) => None,
        Some(_) => {
            mismatches.record(MismatchSite::Accumulator, field);
            None
        }
    }
}

fn replace_if(best: &mut Option<Number>, candidate: &Number, wanted: Ordering) {
    let better = match best {
        Some(current) => compare_numbers(candidate, current) == wanted,
        None => true,
    };
    if better {
        *best = Some(candidate.clone());
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|v| Record::from_value(v).unwrap())
            .collect()
    }

    fn fold(op: &AccumulatorOp, input: &[Record]) -> (Value, TypeMismatches) {
        let mut mismatches = TypeMismatches::default();
        let mut acc = GroupAccumulator::new(op);
        for record in input {
            acc.accumulate(record, &mut mismatches);
        }
        (acc.finish(), mismatches)
    }

    #[test]
    fn test_avg_excludes_missing_and_non_numeric() {
        let input = records(vec![json!({"marks": 85}), json!({}), json!({"marks": "N/A"})]);
        let (avg, mismatches) = fold(&AccumulatorOp::Avg("marks".into()), &input);
        assert_eq!(avg.as_f64(), Some(85.0));
        assert_eq!(mismatches.accumulators(), 1);
    }

    #[test]
    fn test_avg_of_nothing_is_null() {
        let input = records(vec![json!({"marks": null}), json!({})]);
        let (avg, _) = fold(&AccumulatorOp::Avg("marks".into()), &input);
        assert_eq!(avg, Value::Null);
    }

    #[test]
    fn test_sum_stays_integral() {
        let input = records(vec![json!({"marks": 85}), json!({"marks": 92})]);
        let (sum, _) = fold(&AccumulatorOp::Sum(SumOperand::Field("marks".into())), &input);
        assert_eq!(sum, json!(177));
    }

    #[test]
    fn test_sum_switches_to_float() {
        let input = records(vec![json!({"x": 1}), json!({"x": 0.5})]);
        let (sum, _) = fold(&AccumulatorOp::Sum(SumOperand::Field("x".into())), &input);
        assert_eq!(sum, json!(1.5));

        let input = records(vec![json!({"x": u64::MAX}), json!({"x": u64::MAX})]);
        let (sum, _) = fold(&AccumulatorOp::Sum(SumOperand::Field("x".into())), &input);
        assert!(sum.is_f64());
    }

    #[test]
    fn test_sum_result_independent_of_order() {
        let op = AccumulatorOp::Sum(SumOperand::Field("x".into()));
        let forward = records(vec![json!({"x": i64::MAX}), json!({"x": 1}), json!({"x": -1})]);
        let backward = records(vec![json!({"x": 1}), json!({"x": -1}), json!({"x": i64::MAX})]);

        let (a, _) = fold(&op, &forward);
        let (b, _) = fold(&op, &backward);
        assert_eq!(a, json!(i64::MAX));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sum_past_i64_stays_integral() {
        let input = records(vec![json!({"x": i64::MAX}), json!({"x": 1})]);
        let (sum, _) = fold(&AccumulatorOp::Sum(SumOperand::Field("x".into())), &input);
        assert_eq!(sum, json!(9223372036854775808u64));
    }

    #[test]
    fn test_sum_of_nothing_is_zero() {
        let (sum, _) = fold(&AccumulatorOp::Sum(SumOperand::Field("x".into())), &[]);
        assert_eq!(sum, json!(0));
    }

    #[test]
    fn test_sum_constant_counts_records() {
        let input = records(vec![json!({}), json!({"a": 1}), json!({"b": "x"})]);
        let (n, _) = fold(&AccumulatorOp::Sum(SumOperand::Constant(1.into())), &input);
        assert_eq!(n, json!(3));
    }

    #[test]
    fn test_max_min_keep_original_number() {
        let input = records(vec![
            json!({"marks": 67}),
            json!({"marks": "absent"}),
            json!({"marks": 74.5}),
            json!({"marks": 58}),
        ]);
        let (max, _) = fold(&AccumulatorOp::Max("marks".into()), &input);
        let (min, mismatches) = fold(&AccumulatorOp::Min("marks".into()), &input);
        assert_eq!(max, json!(74.5));
        assert_eq!(min, json!(58));
        assert_eq!(mismatches.accumulators(), 1);
    }

    #[test]
    fn test_max_of_nothing_is_null() {
        let input = records(vec![json!({"marks": "N/A"})]);
        let (max, _) = fold(&AccumulatorOp::Max("marks".into()), &input);
        assert_eq!(max, Value::Null);
    }

    #[test]
    fn test_count_counts_every_record() {
        let input = records(vec![json!({}), json!({"marks": null}), json!({"marks": 1})]);
        let (n, _) = fold(&AccumulatorOp::Count, &input);
        assert_eq!(n, json!(3));
    }
}
