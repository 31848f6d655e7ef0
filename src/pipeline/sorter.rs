//! Record sorting
//!
//! Sorts by one or more keys, deterministically.

use std::cmp::Ordering;

use crate::record::value::total_cmp;
use crate::record::Record;

use super::stage::{SortDirection, SortKey};

/// Sorts records
pub struct RecordSorter;

impl RecordSorter {
    /// Sorts records according to the sort keys.
    ///
    /// Sort is stable: records with equal keys keep their relative order.
    pub fn sort(records: &mut [Record], keys: &[SortKey]) {
        records.sort_by(|a, b| Self::compare(a, b, keys));
    }

    fn compare(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
        for key in keys {
            let ordering = total_cmp(a.lookup(&key.field), b.lookup(&key.field));
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
