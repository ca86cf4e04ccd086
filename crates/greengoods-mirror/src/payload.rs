use chrono::{DateTime, Utc};
use greengoods_types::{Approval, Assessment, CommunityId, Identity, RecordRef, Submission};
use serde::{Deserialize, Serialize};

/// Denormalized snapshot sent to the registry's "create project update" call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MirrorPayload {
    pub title: String,
    pub text: String,
    /// First evidence reference of the source record, if any.
    pub evidence: Option<String>,
    pub author: Identity,
    pub source: RecordRef,
    pub recorded_at: DateTime<Utc>,
}

impl MirrorPayload {
    /// Snapshot of an approved submission: the action title, the approver's
    /// feedback and the submission's first piece of evidence.
    pub fn from_approval(action_title: &str, approval: &Approval, submission: &Submission) -> Self {
        Self {
            title: action_title.to_string(),
            text: approval.feedback.clone(),
            evidence: submission.evidence.first().cloned(),
            author: approval.approver.clone(),
            source: RecordRef::Approval(approval.id),
            recorded_at: approval.decided_at,
        }
    }

    pub fn from_assessment(assessment: &Assessment) -> Self {
        Self {
            title: assessment.title.clone(),
            text: assessment.description.clone(),
            evidence: assessment.evidence.first().cloned(),
            author: assessment.author.clone(),
            source: RecordRef::Assessment(assessment.id),
            recorded_at: assessment.created_at,
        }
    }
}

/// Request to create a community's mirror project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub community: CommunityId,
    pub title: String,
    pub description: String,
    pub owner: Identity,
}
