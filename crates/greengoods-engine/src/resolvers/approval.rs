use greengoods_mirror::MirrorPayload;
use greengoods_registry::Role;
use greengoods_types::{Approval, ApprovalClaim, ApprovalId, CommunityId, Identity};

use super::{ClaimResolver, Resolved, ResolverView};
use crate::context::ClaimKind;
use crate::error::EngineError;

/// Decision on a Submission by a current approver of its community.
pub struct ApprovalResolver;

impl ClaimResolver for ApprovalResolver {
    type Claim = ApprovalClaim;
    type Record = Approval;

    fn kind(&self) -> ClaimKind {
        ClaimKind::Approval
    }

    fn required_role(&self) -> Role {
        Role::Approver
    }

    fn community(&self, claim: &ApprovalClaim) -> CommunityId {
        claim.community
    }

    fn claimant<'c>(&self, claim: &'c ApprovalClaim) -> &'c Identity {
        &claim.approver
    }

    fn check_reference(&self, claim: &ApprovalClaim, view: &ResolverView<'_>) -> Result<(), EngineError> {
        view.active_community(&claim.community)?;

        let submission = view
            .store
            .submission(&claim.submission)
            .ok_or_else(|| EngineError::NotFound(claim.submission.to_string()))?;
        if submission.community != claim.community {
            return Err(EngineError::InvalidReference(format!(
                "{} does not belong to {}",
                claim.submission, claim.community
            )));
        }

        if view.policy.reject_duplicate_approvals && view.store.is_decided(&claim.submission) {
            return Err(EngineError::AlreadyDecided(claim.submission));
        }
        Ok(())
    }

    /// Feedback is free text and the decision is a plain bool; there is
    /// nothing structural left to reject.
    fn check_content(&self, _claim: &ApprovalClaim, _view: &ResolverView<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    fn build(&self, claim: &ApprovalClaim, view: &ResolverView<'_>) -> Result<Resolved<Approval>, EngineError> {
        let submission = view
            .store
            .submission(&claim.submission)
            .ok_or_else(|| EngineError::NotFound(claim.submission.to_string()))?;

        let approval = Approval {
            id: ApprovalId::new(),
            submission: claim.submission,
            community: claim.community,
            approver: claim.approver.clone(),
            approved: claim.approved,
            feedback: claim.feedback.clone(),
            decided_at: view.now,
        };

        // Only positive decisions are mirrored.
        let mirror = claim.approved.then(|| {
            let title = view
                .catalog
                .get(&submission.action)
                .map(|a| a.title.clone())
                .unwrap_or_else(|| submission.action.to_string());
            MirrorPayload::from_approval(&title, &approval, submission)
        });

        Ok(Resolved {
            record: approval,
            mirror,
        })
    }
}
