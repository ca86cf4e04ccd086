use greengoods_registry::Role;
use greengoods_types::{CommunityId, Identity, Submission, SubmissionClaim, SubmissionId};

use super::{check_evidence, ClaimResolver, Resolved, ResolverView};
use crate::context::ClaimKind;
use crate::error::EngineError;

/// Work submission: a current member claims an open action.
pub struct SubmissionResolver;

impl ClaimResolver for SubmissionResolver {
    type Claim = SubmissionClaim;
    type Record = Submission;

    fn kind(&self) -> ClaimKind {
        ClaimKind::Submission
    }

    fn required_role(&self) -> Role {
        Role::Member
    }

    fn community(&self, claim: &SubmissionClaim) -> CommunityId {
        claim.community
    }

    fn claimant<'c>(&self, claim: &'c SubmissionClaim) -> &'c Identity {
        &claim.submitter
    }

    fn check_reference(&self, claim: &SubmissionClaim, view: &ResolverView<'_>) -> Result<(), EngineError> {
        view.active_community(&claim.community)?;
        if !view.catalog.is_open(&claim.action, view.now)? {
            return Err(EngineError::InvalidReference(format!(
                "{} is not open for submissions",
                claim.action
            )));
        }
        Ok(())
    }

    fn check_content(&self, claim: &SubmissionClaim, view: &ResolverView<'_>) -> Result<(), EngineError> {
        if !claim.metadata.is_object() {
            return Err(EngineError::InvalidContent("metadata must be a JSON object".into()));
        }
        check_evidence(&claim.evidence)?;

        let required = view.policy.min_submission_evidence;
        if claim.evidence.len() < required {
            return Err(EngineError::InvalidContent(format!(
                "at least {} evidence reference(s) required, got {}",
                required,
                claim.evidence.len()
            )));
        }
        Ok(())
    }

    fn build(&self, claim: &SubmissionClaim, view: &ResolverView<'_>) -> Result<Resolved<Submission>, EngineError> {
        Ok(Resolved {
            record: Submission {
                id: SubmissionId::new(),
                community: claim.community,
                submitter: claim.submitter.clone(),
                action: claim.action,
                feedback: claim.feedback.clone(),
                metadata: claim.metadata.clone(),
                evidence: claim.evidence.clone(),
                created_at: view.now,
            },
            // Submissions are not mirrored; their approvals are.
            mirror: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Check, ResolutionContext};
    use crate::resolvers::fixtures::World;
    use crate::resolvers::{resolve, resolve_in};
    use greengoods_types::ActionId;
    use serde_json::json;

    #[test]
    fn member_submits_open_action() {
        let world = World::new();
        let claim = SubmissionClaim::new(world.community, "0xa", world.planting)
            .metadata(json!({"species": "Mango"}))
            .evidence("ipfs://photo");

        let resolved = resolve(&SubmissionResolver, &claim, &world.view()).unwrap();
        assert_eq!(resolved.record.submitter, Identity::new("0xa"));
        assert_eq!(resolved.record.metadata["species"], "Mango");
        assert!(resolved.mirror.is_none());
    }

    #[test]
    fn non_member_rejected_before_anything_else() {
        let world = World::new();
        // unknown action, non-object metadata, blank evidence: all wrong
        let claim = SubmissionClaim::new(world.community, "0xstranger", ActionId(99))
            .metadata(json!("not an object"))
            .evidence(" ");

        let mut ctx = ResolutionContext::new(ClaimKind::Submission, world.community, claim.submitter.clone());
        let err = resolve_in(&SubmissionResolver, &claim, &world.view(), &mut ctx).unwrap_err();

        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(ctx.evaluated(), vec![Check::Identity]);
    }

    #[test]
    fn unknown_community_is_unauthorized() {
        let world = World::new();
        let claim = SubmissionClaim::new(CommunityId::new(), "0xa", world.planting);
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn unknown_action_not_found() {
        let world = World::new();
        let claim = SubmissionClaim::new(world.community, "0xa", ActionId(99));
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn closed_action_is_invalid_reference() {
        let world = World::new();
        let claim = SubmissionClaim::new(world.community, "0xa", world.harvest);
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "INVALID_REFERENCE");
    }

    #[test]
    fn deactivated_community_is_invalid_reference() {
        let mut world = World::new();
        world
            .registry
            .deactivate(&Identity::new("0xowner"), &world.community)
            .unwrap();
        let claim = SubmissionClaim::new(world.community, "0xa", world.planting);
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "INVALID_REFERENCE");
    }

    #[test]
    fn metadata_must_be_object() {
        let world = World::new();
        let claim = SubmissionClaim::new(world.community, "0xa", world.planting).metadata(json!([1, 2]));
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONTENT");
    }

    #[test]
    fn blank_evidence_rejected() {
        let world = World::new();
        let claim = SubmissionClaim::new(world.community, "0xa", world.planting).evidence("");
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert!(err.to_string().contains("evidence reference 0"));
    }

    #[test]
    fn policy_minimum_evidence() {
        let mut world = World::new();
        world.policy.min_submission_evidence = 1;
        let claim = SubmissionClaim::new(world.community, "0xa", world.planting);
        let err = resolve(&SubmissionResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONTENT");

        let claim = claim.evidence("ipfs://photo");
        assert!(resolve(&SubmissionResolver, &claim, &world.view()).is_ok());
    }
}
