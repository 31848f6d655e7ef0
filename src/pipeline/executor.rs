//! Stage executor
//!
//! Applies one validated stage to an ordered record sequence, producing a
//! new sequence. Input records are consumed, never mutated in place.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::TypeMismatches;
use crate::filter::{Filter, PredicateFilter};
use crate::record::value::{canonical_key, values_equal};
use crate::record::Record;

use super::accumulator::GroupAccumulator;
use super::sorter::RecordSorter;
use super::stage::{GroupSpec, Stage};

/// Executes single stages
pub struct StageExecutor;

impl StageExecutor {
    /// Applies `stage` to `records`.
    ///
    /// The stage must already have passed `Stage::validate`.
    pub fn apply(stage: &Stage, records: Vec<Record>, mismatches: &mut TypeMismatches) -> Vec<Record> {
        match stage {
            Stage::Match(filter) => Self::filter(records, filter, mismatches),
            Stage::Group(spec) => Self::group(&records, spec, mismatches),
            Stage::Project(fields) => Self::project(records, fields),
            Stage::Sort(keys) => {
                let mut records = records;
                RecordSorter::sort(&mut records, keys);
                records
            }
            Stage::Limit(n) => {
                let mut records = records;
                records.truncate(to_len(*n));
                records
            }
            Stage::Skip(n) => records.into_iter().skip(to_len(*n)).collect(),
            Stage::Count(name) => {
                if records.is_empty() {
                    return records;
                }
                vec![Record::new().with(name.as_str(), Value::from(records.len()))]
            }
        }
    }

    fn filter(records: Vec<Record>, filter: &Filter, mismatches: &mut TypeMismatches) -> Vec<Record> {
        records
            .into_iter()
            .filter(|record| PredicateFilter::matches_counting(record, filter, mismatches))
            .collect()
    }

    fn project(records: Vec<Record>, fields: &[String]) -> Vec<Record> {
        records
            .into_iter()
            .map(|record| {
                let mut projected = Record::new();
                for field in fields {
                    if let Some(value) = record.lookup(field) {
                        projected.set_path(field, value.clone());
                    }
                }
                projected
            })
            .collect()
    }

    /// Partitions by key, then accumulates each partition.
    ///
    /// Groups are emitted in first-seen key order.
    fn group(records: &[Record], spec: &GroupSpec, mismatches: &mut TypeMismatches) -> Vec<Record> {
        // All keys are resolved before any accumulation starts
        let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
        let mut keys: Vec<Value> = Vec::new();
        let assignment: Vec<usize> = records
            .iter()
            .map(|record| {
                let key = spec.key.resolve(record);
                let bucket = buckets.entry(canonical_key(&key)).or_default();
                if let Some(&slot) = bucket.iter().find(|&&slot| values_equal(&keys[slot], &key)) {
                    return slot;
                }
                keys.push(key);
                bucket.push(keys.len() - 1);
                keys.len() - 1
            })
            .collect();

        let mut groups: Vec<Vec<GroupAccumulator<'_>>> = keys
            .iter()
            .map(|_| {
                spec.aggregations
                    .iter()
                    .map(|aggregation| GroupAccumulator::new(&aggregation.op))
                    .collect()
            })
            .collect();

        for (record, slot) in records.iter().zip(assignment) {
            for accumulator in groups[slot].iter_mut() {
                accumulator.accumulate(record, mismatches);
            }
        }

        keys.into_iter()
            .zip(groups)
            .map(|(key, accumulators)| {
                let mut out = Record::new().with("_id", key);
                for (aggregation, accumulator) in spec.aggregations.iter().zip(accumulators) {
                    out.insert(aggregation.output.as_str(), accumulator.finish());
                }
                out
            })
            .collect()
    }
}

/// Validated counts are non-negative
fn to_len(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
