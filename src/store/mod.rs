use std::collections::HashMap;
use nohash::IntMap;

use crate::positions::PositionId;
use crate::records::PositionRecord;

pub mod db;

/// One entry of the canonical store. The record payload is immutable; only
/// the status tag flips when a deeper analysis dethrones it.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub record: PositionRecord,
    pub superseded: bool,
}

/// In-memory snapshot of the append-only canonical dataset.
///
/// Invariant: at most one non-superseded entry per position id. Superseded
/// entries are retained forever as the audit trail.
#[derive(Default)]
pub struct CanonicalStore {
    entries: Vec<StoredRecord>,
    accepted_by_id: IntMap<u64, usize>,
    entries_by_id: IntMap<u64, Vec<usize>>,
    latest_by_contributor: HashMap<String, i64>,
}

impl CanonicalStore {
    pub fn new() -> CanonicalStore {
        CanonicalStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[StoredRecord] {
        &self.entries
    }

    /// The accepted record for this position, if any.
    pub fn accepted(&self, id: PositionId) -> Option<&PositionRecord> {
        self.accepted_by_id
            .get(&id.0)
            .map(|&index| &self.entries[index].record)
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted_by_id.len()
    }

    /// Appends a record as the accepted entry for its position. The caller
    /// must have dethroned any previous accepted entry first.
    pub fn insert_accepted(&mut self, record: PositionRecord) {
        debug_assert!(
            !self.accepted_by_id.contains_key(&record.position_id),
            "second accepted record for position {}",
            record.position_id,
        );

        self.accepted_by_id.insert(record.position_id, self.entries.len());
        self.push(record, false);
    }

    /// Appends a record that lost conflict resolution, keeping the audit trail.
    pub fn insert_superseded(&mut self, record: PositionRecord) {
        self.push(record, true);
    }

    /// Flips the accepted entry for this position to superseded.
    /// Returns false when there was nothing to dethrone.
    pub fn supersede(&mut self, id: PositionId) -> bool {
        match self.accepted_by_id.remove(&id.0) {
            Some(index) => {
                self.entries[index].superseded = true;
                true
            }
            None => false,
        }
    }

    /// The latest submission timestamp seen from this contributor, across
    /// accepted and superseded entries alike.
    pub fn latest_timestamp(&self, contributor: &str) -> Option<i64> {
        self.latest_by_contributor.get(contributor).copied()
    }

    /// Whether this exact submission (same id, contributor, timestamp) is
    /// already stored, accepted or not. Detects re-merged batches.
    pub fn contains_identical(&self, record: &PositionRecord) -> bool {
        self.entries_by_id
            .get(&record.position_id)
            .map(|indices| {
                indices
                    .iter()
                    .any(|&index| self.entries[index].record.same_submission(record))
            })
            .unwrap_or(false)
    }

    fn push(&mut self, record: PositionRecord, superseded: bool) {
        let index = self.entries.len();
        self.entries_by_id
            .entry(record.position_id)
            .or_default()
            .push(index);

        let latest = self
            .latest_by_contributor
            .entry(record.contributor.clone())
            .or_insert(record.submitted_at);
        *latest = (*latest).max(record.submitted_at);

        self.entries.push(StoredRecord { record, superseded });
    }
}
