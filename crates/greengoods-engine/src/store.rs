use std::collections::HashMap;

use chrono::{DateTime, Utc};
use greengoods_types::{
    Approval, ApprovalId, Assessment, AssessmentId, CommunityId, Identity, RecordRef, Submission,
    SubmissionId,
};

use crate::error::StoreError;

/// Filter for querying submissions and assessments.
#[derive(Clone, Debug, Default)]
pub struct RecordFilter {
    pub community: Option<CommunityId>,
    /// Submitter for submissions, author for assessments.
    pub identity: Option<Identity>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_community(mut self, community: CommunityId) -> Self {
        self.community = Some(community);
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_range = Some((from, to));
        self
    }

    fn matches(&self, community: &CommunityId, identity: &Identity, at: &DateTime<Utc>) -> bool {
        if let Some(ref c) = self.community {
            if c != community {
                return false;
            }
        }
        if let Some(ref i) = self.identity {
            if i != identity {
                return false;
            }
        }
        if let Some((ref from, ref to)) = self.time_range {
            if at < from || at > to {
                return false;
            }
        }
        true
    }
}

/// Attestation Store: append-only ledger of every accepted claim.
///
/// No delete or modify operations exist. Approvals are kept in arrival order
/// per submission; the last one is canonical.
pub struct AttestationStore {
    submissions: Vec<Submission>,
    submission_index: HashMap<SubmissionId, usize>,
    approvals: Vec<Approval>,
    approval_index: HashMap<ApprovalId, usize>,
    approvals_by_submission: HashMap<SubmissionId, Vec<usize>>,
    assessments: Vec<Assessment>,
    assessment_index: HashMap<AssessmentId, usize>,
}

impl AttestationStore {
    pub fn new() -> Self {
        Self {
            submissions: Vec::new(),
            submission_index: HashMap::new(),
            approvals: Vec::new(),
            approval_index: HashMap::new(),
            approvals_by_submission: HashMap::new(),
            assessments: Vec::new(),
            assessment_index: HashMap::new(),
        }
    }

    pub fn append_submission(&mut self, submission: Submission) -> Result<(), StoreError> {
        if self.submission_index.contains_key(&submission.id) {
            return Err(StoreError::DuplicateEntry(RecordRef::Submission(submission.id)));
        }
        self.submission_index
            .insert(submission.id, self.submissions.len());
        self.submissions.push(submission);
        Ok(())
    }

    /// Append an approval. The referenced submission must already be stored.
    pub fn append_approval(&mut self, approval: Approval) -> Result<(), StoreError> {
        if self.approval_index.contains_key(&approval.id) {
            return Err(StoreError::DuplicateEntry(RecordRef::Approval(approval.id)));
        }
        if !self.submission_index.contains_key(&approval.submission) {
            return Err(StoreError::NotFound(RecordRef::Submission(approval.submission)));
        }
        let position = self.approvals.len();
        self.approval_index.insert(approval.id, position);
        self.approvals_by_submission
            .entry(approval.submission)
            .or_default()
            .push(position);
        self.approvals.push(approval);
        Ok(())
    }

    pub fn append_assessment(&mut self, assessment: Assessment) -> Result<(), StoreError> {
        if self.assessment_index.contains_key(&assessment.id) {
            return Err(StoreError::DuplicateEntry(RecordRef::Assessment(assessment.id)));
        }
        self.assessment_index
            .insert(assessment.id, self.assessments.len());
        self.assessments.push(assessment);
        Ok(())
    }

    pub fn submission(&self, id: &SubmissionId) -> Option<&Submission> {
        self.submission_index.get(id).map(|&i| &self.submissions[i])
    }

    pub fn approval(&self, id: &ApprovalId) -> Option<&Approval> {
        self.approval_index.get(id).map(|&i| &self.approvals[i])
    }

    pub fn assessment(&self, id: &AssessmentId) -> Option<&Assessment> {
        self.assessment_index.get(id).map(|&i| &self.assessments[i])
    }

    /// All approvals of a submission, oldest first.
    pub fn approvals_for(&self, submission: &SubmissionId) -> Vec<&Approval> {
        self.approvals_by_submission
            .get(submission)
            .map(|positions| positions.iter().map(|&i| &self.approvals[i]).collect())
            .unwrap_or_default()
    }

    /// The latest recorded approval of a submission.
    pub fn canonical_approval(&self, submission: &SubmissionId) -> Option<&Approval> {
        self.approvals_by_submission
            .get(submission)
            .and_then(|positions| positions.last())
            .map(|&i| &self.approvals[i])
    }

    pub fn is_decided(&self, submission: &SubmissionId) -> bool {
        self.approvals_by_submission
            .get(submission)
            .map(|p| !p.is_empty())
            .unwrap_or(false)
    }

    pub fn submissions(&self, filter: &RecordFilter) -> Vec<&Submission> {
        self.submissions
            .iter()
            .filter(|s| filter.matches(&s.community, &s.submitter, &s.created_at))
            .collect()
    }

    pub fn assessments(&self, filter: &RecordFilter) -> Vec<&Assessment> {
        self.assessments
            .iter()
            .filter(|a| filter.matches(&a.community, &a.author, &a.created_at))
            .collect()
    }

    /// Every record belonging to a community, in a stable order.
    pub fn records_for(&self, community: &CommunityId) -> Vec<RecordRef> {
        let submissions = self
            .submissions
            .iter()
            .filter(|s| s.community == *community)
            .map(|s| RecordRef::Submission(s.id));
        let approvals = self
            .approvals
            .iter()
            .filter(|a| a.community == *community)
            .map(|a| RecordRef::Approval(a.id));
        let assessments = self
            .assessments
            .iter()
            .filter(|a| a.community == *community)
            .map(|a| RecordRef::Assessment(a.id));
        submissions.chain(approvals).chain(assessments).collect()
    }

    pub fn len(&self) -> usize {
        self.submissions.len() + self.approvals.len() + self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AttestationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use greengoods_types::ActionId;

    fn submission(community: CommunityId, submitter: &str) -> Submission {
        Submission {
            id: SubmissionId::new(),
            community,
            submitter: Identity::new(submitter),
            action: ActionId(1),
            feedback: String::new(),
            metadata: serde_json::json!({}),
            evidence: vec![],
            created_at: Utc::now(),
        }
    }

    fn approval(submission: &Submission, approved: bool) -> Approval {
        Approval {
            id: ApprovalId::new(),
            submission: submission.id,
            community: submission.community,
            approver: Identity::new("0xb"),
            approved,
            feedback: String::new(),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn append_and_lookup() {
        let mut store = AttestationStore::new();
        let s = submission(CommunityId::new(), "0xa");
        store.append_submission(s.clone()).unwrap();
        assert_eq!(store.submission(&s.id), Some(&s));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_submission_rejected() {
        let mut store = AttestationStore::new();
        let s = submission(CommunityId::new(), "0xa");
        store.append_submission(s.clone()).unwrap();
        let err = store.append_submission(s.clone()).unwrap_err();
        assert_eq!(err, StoreError::DuplicateEntry(RecordRef::Submission(s.id)));
    }

    #[test]
    fn approval_requires_stored_submission() {
        let mut store = AttestationStore::new();
        let s = submission(CommunityId::new(), "0xa");
        let err = store.append_approval(approval(&s, true)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn latest_approval_is_canonical() {
        let mut store = AttestationStore::new();
        let s = submission(CommunityId::new(), "0xa");
        store.append_submission(s.clone()).unwrap();
        assert!(!store.is_decided(&s.id));

        let first = approval(&s, false);
        let second = approval(&s, true);
        store.append_approval(first.clone()).unwrap();
        store.append_approval(second.clone()).unwrap();

        assert!(store.is_decided(&s.id));
        assert_eq!(store.approvals_for(&s.id).len(), 2);
        assert_eq!(store.canonical_approval(&s.id), Some(&second));
        // earlier decision still retrievable, unchanged
        assert_eq!(store.approval(&first.id), Some(&first));
    }

    #[test]
    fn filter_by_community_and_identity() {
        let mut store = AttestationStore::new();
        let c1 = CommunityId::new();
        let c2 = CommunityId::new();
        store.append_submission(submission(c1, "0xa")).unwrap();
        store.append_submission(submission(c1, "0xc")).unwrap();
        store.append_submission(submission(c2, "0xa")).unwrap();

        assert_eq!(store.submissions(&RecordFilter::new().with_community(c1)).len(), 2);
        let filter = RecordFilter::new()
            .with_community(c1)
            .with_identity(Identity::new("0xa"));
        assert_eq!(store.submissions(&filter).len(), 1);
    }

    #[test]
    fn filter_by_time_range() {
        let mut store = AttestationStore::new();
        let s = submission(CommunityId::new(), "0xa");
        let at = s.created_at;
        store.append_submission(s).unwrap();

        let hit = RecordFilter::new().with_time_range(at - Duration::hours(1), at + Duration::hours(1));
        let miss = RecordFilter::new().with_time_range(at + Duration::hours(1), at + Duration::hours(2));
        assert_eq!(store.submissions(&hit).len(), 1);
        assert!(store.submissions(&miss).is_empty());
    }

    #[test]
    fn records_for_community() {
        let mut store = AttestationStore::new();
        let c = CommunityId::new();
        let s = submission(c, "0xa");
        store.append_submission(s.clone()).unwrap();
        let a = approval(&s, true);
        store.append_approval(a.clone()).unwrap();
        store
            .append_submission(submission(CommunityId::new(), "0xz"))
            .unwrap();

        assert_eq!(
            store.records_for(&c),
            vec![RecordRef::Submission(s.id), RecordRef::Approval(a.id)]
        );
    }
}
