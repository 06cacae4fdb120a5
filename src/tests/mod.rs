use crate::positions::{setup_pair, PositionId};
use crate::records::{Evaluation, PositionRecord};

mod codec;
mod claims;
mod merging;

/// A well-formed record for `id` with the declared setups taken from the
/// codec, so only the fields under test need overriding.
pub fn record_for(id: u64, depth: u32, contributor: &str, submitted_at: i64) -> PositionRecord {
    let (white, black) = setup_pair(PositionId(id)).expect("test id in domain");

    PositionRecord {
        position_id: id,
        white: white.to_string(),
        black: black.to_string(),
        evaluation: Evaluation {
            cp: Some(25),
            mate: None,
            depth,
            pv: vec!["e2e4".to_string(), "e7e5".to_string()],
        },
        contributor: contributor.to_string(),
        submitted_at,
        validator: None,
    }
}
