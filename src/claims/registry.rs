use thiserror::Error;

use crate::claims::ClaimRange;
use crate::positions::PositionId;
use crate::store::CanonicalStore;

/// Advisory collision checks for uncoordinated contributors.
///
/// The set of active claims is whatever the transport currently knows about
/// (the open pull requests); it is passed in explicitly and never owned here.
/// These checks reduce wasted engine time, the authoritative duplicate check
/// happens again at merge time against the then-current store.

#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("claim {attempted} overlaps active claim {existing}")]
pub struct OverlapError {
    pub attempted: ClaimRange,
    pub existing: ClaimRange,
}

/// Rejects a new claim that collides with any active one. Claims are never
/// auto-split to fit: a partial claim would hide the contributor's intent.
pub fn register_claim(claim: &ClaimRange, existing: &[ClaimRange]) -> Result<(), OverlapError> {
    for active in existing {
        if claim.overlaps(active) {
            return Err(OverlapError {
                attempted: claim.clone(),
                existing: active.clone(),
            });
        }
    }

    Ok(())
}

/// Whether the store already holds an accepted record for this position.
/// Disposition of a duplicate is the aggregator's concern.
pub fn check_duplicate(id: PositionId, store: &CanonicalStore) -> bool {
    store.accepted(id).is_some()
}
