use std::fmt;

use greengoods_types::{CommunityId, Identity};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Kind of claim being resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Submission,
    Approval,
    Assessment,
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClaimKind::Submission => "submission",
            ClaimKind::Approval => "approval",
            ClaimKind::Assessment => "assessment",
        };
        f.write_str(name)
    }
}

/// The checks every resolver runs, in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Identity,
    Reference,
    Content,
}

impl Check {
    pub const ORDER: [Check; 3] = [Check::Identity, Check::Reference, Check::Content];
}

/// Result of a single check.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckResult {
    Pass,
    Reject(EngineError),
}

impl CheckResult {
    pub fn is_pass(&self) -> bool {
        matches!(self, CheckResult::Pass)
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, CheckResult::Reject(_))
    }
}

impl From<Result<(), EngineError>> for CheckResult {
    fn from(result: Result<(), EngineError>) -> Self {
        match result {
            Ok(()) => CheckResult::Pass,
            Err(e) => CheckResult::Reject(e),
        }
    }
}

/// Context carried through one claim's resolution.
///
/// Records each check as it runs so the order of evaluation is observable.
#[derive(Clone, Debug)]
pub struct ResolutionContext {
    pub kind: ClaimKind,
    pub community: CommunityId,
    pub claimant: Identity,
    /// Results from each check that ran, in evaluation order
    pub checks: Vec<(Check, CheckResult)>,
}

impl ResolutionContext {
    pub fn new(kind: ClaimKind, community: CommunityId, claimant: Identity) -> Self {
        Self {
            kind,
            community,
            claimant,
            checks: Vec::new(),
        }
    }

    pub fn record_check(&mut self, check: Check, result: CheckResult) {
        self.checks.push((check, result));
    }

    pub fn has_rejection(&self) -> bool {
        self.checks.iter().any(|(_, r)| r.is_reject())
    }

    /// The first rejecting check and its error, if any.
    pub fn rejection(&self) -> Option<(Check, &EngineError)> {
        self.checks.iter().find_map(|(check, r)| match r {
            CheckResult::Reject(e) => Some((*check, e)),
            CheckResult::Pass => None,
        })
    }

    /// Checks that ran, in order.
    pub fn evaluated(&self) -> Vec<Check> {
        self.checks.iter().map(|(check, _)| *check).collect()
    }
}
