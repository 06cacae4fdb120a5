use std::fmt::{Display, Formatter};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::positions::{PositionId, POSITION_COUNT};

pub mod registry;

/// Claim tokens are branch names of the fixed shape `analysis/<start>_<end>`,
/// with a half-open id interval `[start, end)`.

pub const CLAIM_PREFIX: &str = "analysis";

lazy_static! {
    static ref CLAIM_TOKEN: Regex = Regex::new(r"^analysis/(\d+)_(\d+)$")
        .expect("claim token pattern is well-formed");
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum MalformedClaimError {
    #[error("claim token '{0}' does not match '{CLAIM_PREFIX}/<start>_<end>'")]
    Shape(String),
    #[error("claim bound {0} is outside the identifier domain [0, {POSITION_COUNT})")]
    BoundOutOfDomain(String),
    #[error("claim range [{start}, {end}) is empty or inverted")]
    Inverted { start: u64, end: u64 },
}

/// A contributor-reserved, half-open interval of position identifiers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClaimRange {
    pub start: u64,
    pub end: u64,
    pub owner: String,
}

impl ClaimRange {
    /// Parses a claim token. Purely syntactic: advisory collision checks
    /// against other claims live in `registry`.
    pub fn parse(token: &str, owner: &str) -> Result<ClaimRange, MalformedClaimError> {
        let captures = CLAIM_TOKEN
            .captures(token)
            .ok_or_else(|| MalformedClaimError::Shape(token.to_string()))?;

        let bound = |text: &str| -> Result<u64, MalformedClaimError> {
            let value: u64 = text
                .parse()
                .map_err(|_| MalformedClaimError::BoundOutOfDomain(text.to_string()))?;
            if value >= POSITION_COUNT {
                return Err(MalformedClaimError::BoundOutOfDomain(text.to_string()));
            }

            Ok(value)
        };

        let start = bound(&captures[1])?;
        let end = bound(&captures[2])?;

        if start >= end {
            return Err(MalformedClaimError::Inverted { start, end });
        }

        Ok(ClaimRange {
            start,
            end,
            owner: owner.to_string(),
        })
    }

    pub fn token(&self) -> String {
        format!("{}/{}_{}", CLAIM_PREFIX, self.start, self.end)
    }

    pub fn contains(&self, id: PositionId) -> bool {
        self.start <= id.0 && id.0 < self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &ClaimRange) -> bool {
        self.start.max(other.start) < self.end.min(other.end)
    }
}

impl Display for ClaimRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}) held by '{}'", self.start, self.end, self.owner)
    }
}

#[test]
fn check_claim_token_roundtrip() {
    let claim = ClaimRange::parse("analysis/5_10", "alice").unwrap();

    assert_eq!(claim.start, 5);
    assert_eq!(claim.end, 10);
    assert_eq!(claim.token(), "analysis/5_10");
}
