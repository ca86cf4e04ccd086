use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::ids::{ActionId, CommunityId, SubmissionId};
use crate::records::ReportingPeriod;

/// Inbound work submission, as sent by a client. Not yet validated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionClaim {
    pub community: CommunityId,
    pub submitter: Identity,
    pub action: ActionId,
    #[serde(default)]
    pub feedback: String,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl SubmissionClaim {
    pub fn new(community: CommunityId, submitter: impl Into<Identity>, action: ActionId) -> Self {
        Self {
            community,
            submitter: submitter.into(),
            action,
            feedback: String::new(),
            metadata: empty_object(),
            evidence: Vec::new(),
        }
    }

    pub fn feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn evidence(mut self, reference: impl Into<String>) -> Self {
        self.evidence.push(reference.into());
        self
    }
}

/// Inbound decision on a Submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApprovalClaim {
    /// The community the approver claims to act for. Checked against the
    /// Submission's own community.
    pub community: CommunityId,
    pub approver: Identity,
    pub submission: SubmissionId,
    pub approved: bool,
    #[serde(default)]
    pub feedback: String,
}

impl ApprovalClaim {
    pub fn new(
        community: CommunityId,
        approver: impl Into<Identity>,
        submission: SubmissionId,
        approved: bool,
    ) -> Self {
        Self {
            community,
            approver: approver.into(),
            submission,
            approved,
            feedback: String::new(),
        }
    }

    pub fn feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }
}

/// Inbound assessment. Kind and capitals arrive as raw tags and are checked
/// against the known enumerations by the resolver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssessmentClaim {
    pub community: CommunityId,
    pub author: Identity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub kind: String,
    #[serde(default)]
    pub capitals: Vec<String>,
    #[serde(default)]
    pub metrics_ref: String,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub period: Option<ReportingPeriod>,
}

impl AssessmentClaim {
    pub fn new(
        community: CommunityId,
        author: impl Into<Identity>,
        title: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            community,
            author: author.into(),
            title: title.into(),
            description: String::new(),
            kind: kind.into(),
            capitals: Vec::new(),
            metrics_ref: String::new(),
            evidence: Vec::new(),
            period: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn capital(mut self, tag: impl Into<String>) -> Self {
        self.capitals.push(tag.into());
        self
    }

    pub fn metrics_ref(mut self, reference: impl Into<String>) -> Self {
        self.metrics_ref = reference.into();
        self
    }

    pub fn evidence(mut self, reference: impl Into<String>) -> Self {
        self.evidence.push(reference.into());
        self
    }

    pub fn period(mut self, period: ReportingPeriod) -> Self {
        self.period = Some(period);
        self
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_claim_defaults_from_json() {
        let community = CommunityId::new();
        let json = serde_json::json!({
            "community": community,
            "submitter": "0xA",
            "action": 1,
        });
        let claim: SubmissionClaim = serde_json::from_value(json).unwrap();
        assert!(claim.metadata.is_object());
        assert!(claim.evidence.is_empty());
        assert_eq!(claim.submitter.as_str(), "0xa");
    }
}
