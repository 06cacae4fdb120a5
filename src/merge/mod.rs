use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;

use crate::claims::ClaimRange;
use crate::positions::{PositionId, RangeError};
use crate::records::validator::{
    validate, RejectReason, ReanalysisOracle, ValidationConfig, ValidationContext,
    ValidationOutcome,
};
use crate::records::PositionRecord;
use crate::store::CanonicalStore;

pub mod outcome;

#[derive(Error, Debug)]
pub enum MergeError {
    /// A decode failure for an id already confirmed in-domain. This is a
    /// logic defect, not bad input: the whole batch is aborted rather than
    /// risking a corrupted identifier mapping.
    #[error("position codec violated its bijection invariant: {0}")]
    CodecViolation(#[from] RangeError),
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectedRecord {
    pub position_id: u64,
    pub contributor: String,
    pub reason: RejectReason,
}

/// The artifact the transport uses to label the submission: every record's
/// fate, individually reported. No silent partial success.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MergeReport {
    pub accepted: Vec<u64>,
    pub superseded: Vec<u64>,
    pub rejected: Vec<RejectedRecord>,
}

impl MergeReport {
    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn superseded_count(&self) -> usize {
        self.superseded.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }

    fn reject(&mut self, record: &PositionRecord, reason: RejectReason) {
        self.rejected.push(RejectedRecord {
            position_id: record.position_id,
            contributor: record.contributor.clone(),
            reason,
        });
    }
}

impl Display for MergeReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "merge report: {} accepted, {} superseded, {} rejected",
            self.accepted_count(),
            self.superseded_count(),
            self.rejected_count(),
        )?;

        for id in &self.accepted {
            writeln!(f, "accepted {}", id)?;
        }
        for id in &self.superseded {
            writeln!(f, "superseded {}", id)?;
        }
        for rejected in &self.rejected {
            writeln!(
                f,
                "rejected {} ({}): {} [{}]",
                rejected.position_id,
                rejected.contributor,
                rejected.reason,
                rejected.reason.code(),
            )?;
        }

        Ok(())
    }
}

pub struct MergeContext<'a> {
    pub claim: &'a ClaimRange,
    pub batch_bounds: Option<(u64, u64)>,
    pub config: &'a ValidationConfig,
    pub oracle: Option<&'a dyn ReanalysisOracle>,
}

/// Conflict precedence between two records for the same position: greater
/// search depth wins, ties broken by earlier submission, then by contributor
/// name so the result never depends on batch order.
fn conflict_order(a: &PositionRecord, b: &PositionRecord) -> Ordering {
    a.evaluation
        .depth
        .cmp(&b.evaluation.depth)
        .then_with(|| b.submitted_at.cmp(&a.submitted_at))
        .then_with(|| b.contributor.cmp(&a.contributor))
}

/// Merges a batch into the store, deterministically given the store's prior
/// state. Validation runs against the pre-merge snapshot; conflict
/// resolution sees the final batch-plus-store state for each position, not
/// a streaming first-write-wins.
///
/// Records identical to an already-stored submission are rejected as
/// duplicates, which makes re-merging a batch idempotent. A losing fresh
/// record is appended with the superseded marker instead, never discarded.
pub fn merge(
    batch: &[PositionRecord],
    store: &mut CanonicalStore,
    ctx: &MergeContext,
) -> Result<MergeReport, MergeError> {
    let mut report = MergeReport::default();
    let mut valid: Vec<&PositionRecord> = Vec::new();

    {
        let validation_ctx = ValidationContext {
            claim: ctx.claim,
            batch_bounds: ctx.batch_bounds,
            store,
            config: ctx.config,
            oracle: ctx.oracle,
        };

        for record in batch {
            if store.contains_identical(record) {
                report.reject(record, RejectReason::Duplicate(record.position_id));
                continue;
            }

            match validate(record, &validation_ctx)? {
                ValidationOutcome::Accepted => valid.push(record),
                ValidationOutcome::Rejected(reason) => report.reject(record, reason),
            }
        }
    }

    let groups = valid.into_iter().into_group_map_by(|record| record.position_id);

    for (id, group) in groups.into_iter().sorted_by_key(|(id, _)| *id) {
        let winner = *group
            .iter()
            .max_by(|a, b| conflict_order(a, b))
            .expect("groups are never empty");

        let beats_existing = match store.accepted(PositionId(id)) {
            Some(existing) => conflict_order(winner, existing) == Ordering::Greater,
            None => true,
        };
        let had_existing = store.accepted(PositionId(id)).is_some();

        if beats_existing {
            if had_existing {
                store.supersede(PositionId(id));
                report.superseded.push(id);
            }

            for record in &group {
                if !std::ptr::eq(*record, winner) {
                    store.insert_superseded((*record).clone());
                    report.superseded.push(id);
                }
            }

            store.insert_accepted(winner.clone());
            report.accepted.push(id);
        } else {
            // The store keeps its deeper record; the whole group is retained
            // for the audit trail only.
            for record in &group {
                store.insert_superseded((*record).clone());
                report.superseded.push(id);
            }
        }
    }

    Ok(report)
}
