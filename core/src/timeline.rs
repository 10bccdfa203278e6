//! Entity timeline ordering.
//!
//! The global sort key (card_id, timestamp) is the causality foundation for
//! every rolling computation downstream: after sorting, each card's records
//! form one contiguous, time-ordered run. A violation here silently corrupts
//! the leakage-safety guarantee of the feature extractor.

use crate::types::TransactionRecord;

/// Stable sort by (card_id ascending, timestamp ascending). Records with
/// identical card and timestamp keep their original relative order. No
/// record is dropped or mutated.
pub fn sort_by_entity_time(records: &mut [TransactionRecord]) {
    records.sort_by(|a, b| {
        a.card_id
            .cmp(&b.card_id)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });
}

/// Iterate contiguous per-card runs of an already-sorted slice.
/// Each item is the full timeline slice for one card.
pub fn entity_runs(records: &[TransactionRecord]) -> EntityRuns<'_> {
    EntityRuns { records, start: 0 }
}

pub struct EntityRuns<'a> {
    records: &'a [TransactionRecord],
    start: usize,
}

impl<'a> Iterator for EntityRuns<'a> {
    type Item = &'a [TransactionRecord];

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.records.len() {
            return None;
        }
        let card = &self.records[self.start].card_id;
        let mut end = self.start + 1;
        while end < self.records.len() && &self.records[end].card_id == card {
            end += 1;
        }
        let run = &self.records[self.start..end];
        self.start = end;
        Some(run)
    }
}
