//! Per-field missing value counts.
//!
//! The portal leaves null and empty values out of a record instead of sending
//! them, so a field counts as null for a record exactly when its key is absent.
//! Tallies are plain values: each batch (or slice of a batch) produces its own
//! tally and callers combine them with [NullTally::merge].

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::inspect::FieldSet;
use crate::parallel::batch_ranges;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldNulls {
    pub field: String,
    pub nulls: u64,
}

/// Null counts keyed by the dataset's fields, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NullTally {
    entries: Vec<FieldNulls>,
}

impl NullTally {
    pub fn zeroed(fields: &FieldSet) -> Self {
        Self {
            entries: fields
                .iter()
                .map(|field| FieldNulls {
                    field: field.to_string(),
                    nulls: 0,
                })
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.nulls)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|entry| entry.nulls).sum()
    }

    pub fn entries(&self) -> &[FieldNulls] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `other` into `self`. Both tallies come from the same field set, so
    /// entries line up by position; a field `self` does not know is ignored.
    pub fn merge(&mut self, other: &NullTally) {
        for (position, incoming) in other.entries.iter().enumerate() {
            let slot = match self.entries.get_mut(position) {
                Some(entry) if entry.field == incoming.field => Some(entry),
                _ => self
                    .entries
                    .iter_mut()
                    .find(|entry| entry.field == incoming.field),
            };
            if let Some(entry) = slot {
                entry.nulls += incoming.nulls;
            }
        }
    }

    pub fn merged(mut self, other: NullTally) -> Self {
        self.merge(&other);
        self
    }

    fn count_record(&mut self, record: &Value) {
        for entry in &mut self.entries {
            if record.get(entry.field.as_str()).is_none() {
                entry.nulls += 1;
            }
        }
    }
}

/// Tally one batch on the calling thread.
pub fn tally(fields: &FieldSet, batch: &[Value]) -> NullTally {
    let mut counts = NullTally::zeroed(fields);
    for record in batch {
        counts.count_record(record);
    }
    counts
}

/// Tally one batch split into one slice per thread of the current rayon pool,
/// summing the slice tallies. Totals are identical to [tally].
pub fn tally_parallel(fields: &FieldSet, batch: &[Value]) -> NullTally {
    batch_ranges(batch.len(), rayon::current_num_threads())
        .into_par_iter()
        .map(|(start, end)| tally(fields, &batch[start..end]))
        .reduce(|| NullTally::zeroed(fields), NullTally::merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::WorkerPool;
    use serde_json::json;

    fn fields() -> FieldSet {
        FieldSet::from_names(["vendor", "amount", "agency"])
    }

    fn batch() -> Vec<Value> {
        vec![
            json!({"vendor": "Acme", "amount": "10", "agency": "DoIT"}),
            json!({"vendor": "Acme", "agency": "DoIT"}),
            json!({"amount": "3"}),
            json!({"vendor": null, "amount": "4", "agency": "MDOT"}),
        ]
    }

    #[test]
    fn absent_keys_count_as_null() {
        let counts = tally(&fields(), &batch());
        assert_eq!(counts.get("vendor"), Some(1));
        assert_eq!(counts.get("amount"), Some(1));
        assert_eq!(counts.get("agency"), Some(1));
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn non_object_record_is_null_for_every_field() {
        let counts = tally(&fields(), &[json!("not a record")]);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn order_and_partition_do_not_change_totals() {
        let records = batch();
        let expected = tally(&fields(), &records);

        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(tally(&fields(), &reversed), expected);

        for split in 0..=records.len() {
            let (left, right) = records.split_at(split);
            let combined = tally(&fields(), left).merged(tally(&fields(), right));
            assert_eq!(combined, expected, "split at {split}");
        }

        for workers in [1, 2, 3, 8] {
            let parallel = WorkerPool::with_workers(workers).install(|| tally_parallel(&fields(), &records));
            assert_eq!(parallel, expected, "workers {workers}");
        }
    }

    #[test]
    fn empty_batch_keeps_zeroed_keys() {
        let counts = tally_parallel(&fields(), &[]);
        assert_eq!(counts, NullTally::zeroed(&fields()));
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn merge_ignores_unknown_fields() {
        let mut counts = tally(&fields(), &batch());
        let other = tally(&FieldSet::from_names(["elsewhere"]), &[json!({})]);
        counts.merge(&other);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.get("elsewhere"), None);
    }
}
