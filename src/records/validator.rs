use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;
use anyhow::{Context, Result};
use chess::ChessMove;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claims::ClaimRange;
use crate::positions::{self, PositionId, RangeError, POSITION_COUNT};
use crate::records::{Evaluation, PositionRecord};
use crate::store::CanonicalStore;

/// Sanity bounds for submitted evaluations. The constants are deliberately
/// configuration, not code: the validation job supplies them per run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject records whose centipawn magnitude exceeds this ceiling.
    pub score_ceiling_cp: i64,
    /// Reject records searched shallower than this depth.
    pub min_depth: u32,
    /// Reject records with longer principal variations than this.
    pub max_pv_moves: usize,
    /// Cross-check every Nth position id against the oracle. 0 disables sampling.
    pub cross_check_sample_every: u64,
    /// Allowed centipawn difference between a record and its re-analysis.
    pub cross_check_tolerance_cp: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            score_ceiling_cp: 1500,
            min_depth: 10,
            max_pv_moves: 64,
            cross_check_sample_every: 0,
            cross_check_tolerance_cp: 50,
        }
    }
}

pub fn load_config(path: &Path) -> Result<ValidationConfig> {
    let file = File::open(path)
        .with_context(|| format!("failed to open validation config {}", path.display()))?;
    let config = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("malformed validation config {}", path.display()))?;

    Ok(config)
}

/// Independent re-analysis of a position, supplied by an external
/// collaborator. `None` means the oracle has no opinion on this id.
pub trait ReanalysisOracle {
    fn evaluate(&self, id: PositionId) -> Option<Evaluation>;
}

/// Why a record was turned away. Every variant carries enough context for
/// the contributor to self-correct, and `code` is stable for machines.
#[derive(Error, Debug, Clone, Eq, PartialEq, Serialize)]
pub enum RejectReason {
    #[error("record has neither a centipawn nor a mate score")]
    MissingScore,
    #[error("record has both a centipawn and a mate score")]
    AmbiguousScore,
    #[error("a mate score of 0 is not a valid evaluation")]
    ZeroMate,
    #[error("search depth must be a positive integer")]
    ZeroDepth,
    #[error("unparsable move '{0}' in the principal variation")]
    InvalidPvMove(String),
    #[error("contributor name is empty")]
    EmptyContributor,
    #[error("timestamp {actual} is not later than the contributor's previous submission at {previous}")]
    NonMonotonicTimestamp { actual: i64, previous: i64 },
    #[error("position id {0} is outside the identifier domain [0, {POSITION_COUNT})")]
    IdOutOfDomain(u64),
    #[error("declared setups {white}/{black} do not match position id {id}")]
    SetupMismatch { id: u64, white: String, black: String },
    #[error("position id {id} is outside the claimed range [{start}, {end})")]
    OutsideClaim { id: u64, start: u64, end: u64 },
    #[error("position id {id} is outside the batch bounds [{start}, {end})")]
    OutsideBatchBounds { id: u64, start: u64, end: u64 },
    #[error("score magnitude {actual} exceeds the ceiling of {ceiling} centipawns")]
    ScoreAboveCeiling { actual: i64, ceiling: i64 },
    #[error("search depth {actual} is below the minimum of {minimum}")]
    DepthBelowMinimum { actual: u32, minimum: u32 },
    #[error("principal variation of {actual} moves exceeds the limit of {limit}")]
    PvTooLong { actual: usize, limit: usize },
    #[error("re-analysis disagrees with the record beyond the configured tolerance")]
    CrossCheckMismatch,
    #[error("position {0} already has this record in the canonical store")]
    Duplicate(u64),
}

impl RejectReason {
    /// Stable machine-readable reason code, surfaced to the transport.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingScore => "missing-score",
            RejectReason::AmbiguousScore => "ambiguous-score",
            RejectReason::ZeroMate => "zero-mate",
            RejectReason::ZeroDepth => "zero-depth",
            RejectReason::InvalidPvMove(_) => "invalid-pv-move",
            RejectReason::EmptyContributor => "empty-contributor",
            RejectReason::NonMonotonicTimestamp { .. } => "non-monotonic-timestamp",
            RejectReason::IdOutOfDomain(_) => "id-out-of-domain",
            RejectReason::SetupMismatch { .. } => "setup-mismatch",
            RejectReason::OutsideClaim { .. } => "outside-claim",
            RejectReason::OutsideBatchBounds { .. } => "outside-batch-bounds",
            RejectReason::ScoreAboveCeiling { .. } => "score-above-ceiling",
            RejectReason::DepthBelowMinimum { .. } => "depth-below-minimum",
            RejectReason::PvTooLong { .. } => "pv-too-long",
            RejectReason::CrossCheckMismatch => "cross-check-mismatch",
            RejectReason::Duplicate(_) => "duplicate",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(RejectReason),
}

pub struct ValidationContext<'a> {
    pub claim: &'a ClaimRange,
    /// `START_ID`/`END_ID` bounds of the batch under review, when supplied.
    pub batch_bounds: Option<(u64, u64)>,
    pub store: &'a CanonicalStore,
    pub config: &'a ValidationConfig,
    pub oracle: Option<&'a dyn ReanalysisOracle>,
}

/// Validates one record: structural shape, then range membership, then
/// sanity bounds, then the optional sampled cross-check. Short-circuits on
/// the first failure.
///
/// Pure over its inputs. The only `Err` is a codec bijection violation on an
/// id already confirmed in-domain, which is a programming error and aborts
/// the whole batch rather than risking a corrupted identifier mapping.
pub fn validate(
    record: &PositionRecord,
    ctx: &ValidationContext,
) -> Result<ValidationOutcome, RangeError> {
    if let Some(reason) = check_structural(record, ctx.store) {
        return Ok(ValidationOutcome::Rejected(reason));
    }

    match check_range(record, ctx)? {
        Some(reason) => return Ok(ValidationOutcome::Rejected(reason)),
        None => {}
    }

    if let Some(reason) = check_sanity(&record.evaluation, ctx.config) {
        return Ok(ValidationOutcome::Rejected(reason));
    }

    if let Some(reason) = check_oracle(record, ctx) {
        return Ok(ValidationOutcome::Rejected(reason));
    }

    Ok(ValidationOutcome::Accepted)
}

fn check_structural(record: &PositionRecord, store: &CanonicalStore) -> Option<RejectReason> {
    let eval = &record.evaluation;

    match (eval.cp, eval.mate) {
        (None, None) => return Some(RejectReason::MissingScore),
        (Some(_), Some(_)) => return Some(RejectReason::AmbiguousScore),
        (None, Some(0)) => return Some(RejectReason::ZeroMate),
        _ => {}
    }

    if eval.depth == 0 {
        return Some(RejectReason::ZeroDepth);
    }

    for uci_move in &eval.pv {
        if ChessMove::from_str(uci_move).is_err() {
            return Some(RejectReason::InvalidPvMove(uci_move.clone()));
        }
    }

    if record.contributor.is_empty() {
        return Some(RejectReason::EmptyContributor);
    }

    if let Some(previous) = store.latest_timestamp(&record.contributor) {
        if record.submitted_at <= previous {
            return Some(RejectReason::NonMonotonicTimestamp {
                actual: record.submitted_at,
                previous,
            });
        }
    }

    None
}

fn check_range(
    record: &PositionRecord,
    ctx: &ValidationContext,
) -> Result<Option<RejectReason>, RangeError> {
    let id = record.id();

    if id.0 >= POSITION_COUNT {
        return Ok(Some(RejectReason::IdOutOfDomain(id.0)));
    }

    // In-domain, so a decode failure here means the codec itself is broken.
    let (white, black) = positions::setup_pair(id)?;

    if record.white != white.to_string() || record.black != black.to_string() {
        return Ok(Some(RejectReason::SetupMismatch {
            id: id.0,
            white: record.white.clone(),
            black: record.black.clone(),
        }));
    }

    if !ctx.claim.contains(id) {
        return Ok(Some(RejectReason::OutsideClaim {
            id: id.0,
            start: ctx.claim.start,
            end: ctx.claim.end,
        }));
    }

    if let Some((start, end)) = ctx.batch_bounds {
        if id.0 < start || id.0 >= end {
            return Ok(Some(RejectReason::OutsideBatchBounds { id: id.0, start, end }));
        }
    }

    Ok(None)
}

fn check_sanity(eval: &Evaluation, config: &ValidationConfig) -> Option<RejectReason> {
    if let Some(cp) = eval.cp {
        if cp.abs() > config.score_ceiling_cp {
            return Some(RejectReason::ScoreAboveCeiling {
                actual: cp,
                ceiling: config.score_ceiling_cp,
            });
        }
    }

    if eval.depth < config.min_depth {
        return Some(RejectReason::DepthBelowMinimum {
            actual: eval.depth,
            minimum: config.min_depth,
        });
    }

    if eval.pv.len() > config.max_pv_moves {
        return Some(RejectReason::PvTooLong {
            actual: eval.pv.len(),
            limit: config.max_pv_moves,
        });
    }

    None
}

fn check_oracle(record: &PositionRecord, ctx: &ValidationContext) -> Option<RejectReason> {
    let oracle = ctx.oracle?;
    let every = ctx.config.cross_check_sample_every;
    if every == 0 || record.position_id % every != 0 {
        return None;
    }

    let reanalysis = oracle.evaluate(record.id())?;
    if !evaluations_agree(&record.evaluation, &reanalysis, ctx.config.cross_check_tolerance_cp) {
        return Some(RejectReason::CrossCheckMismatch);
    }

    None
}

/// Two evaluations agree when their centipawn scores are within tolerance,
/// or they claim a forced mate for the same side.
fn evaluations_agree(submitted: &Evaluation, reanalysis: &Evaluation, tolerance_cp: i64) -> bool {
    match (submitted.cp, submitted.mate, reanalysis.cp, reanalysis.mate) {
        (Some(a), _, Some(b), _) => (a - b).abs() <= tolerance_cp,
        (_, Some(a), _, Some(b)) => a.signum() == b.signum(),
        _ => false,
    }
}
