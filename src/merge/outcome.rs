use std::fmt::{Display, Formatter};
use serde::Serialize;

use crate::merge::MergeReport;

/// Terminal disposition of a validation run. The transport maps this to
/// label mutations on the submission; the mapping itself is not ours.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum Outcome {
    Validated,
    PartiallyRejected,
    Rejected,
}

impl Outcome {
    /// The boolean "passed" signal the transport consumes.
    pub fn passed(&self) -> bool {
        *self == Outcome::Validated
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Validated => "validated",
            Outcome::PartiallyRejected => "partially-rejected",
            Outcome::Rejected => "rejected",
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// `Validated` needs zero rejections and at least one acceptance; `Rejected`
/// means nothing was accepted; anything else is partial.
pub fn classify(report: &MergeReport) -> Outcome {
    if report.accepted.is_empty() {
        Outcome::Rejected
    } else if report.rejected.is_empty() {
        Outcome::Validated
    } else {
        Outcome::PartiallyRejected
    }
}
