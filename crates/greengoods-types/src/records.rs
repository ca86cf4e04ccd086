use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capital::{AssessmentKind, Capital};
use crate::identity::Identity;
use crate::ids::{ActionId, ApprovalId, AssessmentId, CommunityId, SubmissionId};

/// A member's claim of having performed a unit of work.
///
/// Immutable once recorded. Referenced by zero or more Approvals, the latest
/// of which is canonical.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub community: CommunityId,
    pub submitter: Identity,
    pub action: ActionId,
    pub feedback: String,
    /// Free-form structured details, always a JSON object.
    pub metadata: serde_json::Value,
    /// Media pointers (IPFS CIDs, URLs).
    pub evidence: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// An approver's decision on exactly one Submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub submission: SubmissionId,
    pub community: CommunityId,
    pub approver: Identity,
    pub approved: bool,
    pub feedback: String,
    pub decided_at: DateTime<Utc>,
}

/// Time span an Assessment reports on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An approver-authored periodic evaluation of a community.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub community: CommunityId,
    pub author: Identity,
    pub title: String,
    pub description: String,
    pub kind: AssessmentKind,
    /// Never empty, no duplicates, sorted.
    pub capitals: Vec<Capital>,
    /// Pointer to the externally stored metrics document.
    pub metrics_ref: String,
    pub evidence: Vec<String>,
    pub period: Option<ReportingPeriod>,
    pub created_at: DateTime<Utc>,
}

/// A typed reference to any record held by the attestation store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Submission(SubmissionId),
    Approval(ApprovalId),
    Assessment(AssessmentId),
}

impl std::fmt::Display for RecordRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordRef::Submission(id) => write!(f, "{}", id),
            RecordRef::Approval(id) => write!(f, "{}", id),
            RecordRef::Assessment(id) => write!(f, "{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ref_serializes_tagged() {
        let id = ApprovalId::new();
        let json = serde_json::to_value(RecordRef::Approval(id)).unwrap();
        assert_eq!(json["kind"], "approval");
        assert_eq!(json["id"], serde_json::to_value(id).unwrap());
    }
}
