//! Claim resolvers.
//!
//! Every claim kind runs the same pipeline: identity, reference, content.
//! The first failing check rejects the claim; nothing is recorded on reject.
//! Resolvers are stateless and read the world through a [`ResolverView`].

pub mod approval;
pub mod assessment;
pub mod submission;

use chrono::{DateTime, Utc};
use greengoods_mirror::MirrorPayload;
use greengoods_registry::{ActionCatalog, CapabilityRegistry, Community, Role};
use greengoods_types::{CommunityId, Identity};
use tracing::{debug, warn};

use crate::context::{Check, CheckResult, ClaimKind, ResolutionContext};
use crate::error::EngineError;
use crate::store::AttestationStore;
use crate::upgrade::ResolverPolicy;

pub use approval::ApprovalResolver;
pub use assessment::AssessmentResolver;
pub use submission::SubmissionResolver;

/// Read-only snapshot of engine state a resolver validates against.
pub struct ResolverView<'a> {
    pub registry: &'a CapabilityRegistry,
    pub catalog: &'a ActionCatalog,
    pub store: &'a AttestationStore,
    /// Policy of the resolver set the claim's community is bound to.
    pub policy: &'a ResolverPolicy,
    pub now: DateTime<Utc>,
}

impl ResolverView<'_> {
    /// The community, which must be active.
    pub fn active_community(&self, id: &CommunityId) -> Result<&Community, EngineError> {
        let community = self
            .registry
            .community(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        if !community.active {
            return Err(EngineError::InvalidReference(format!("{} is deactivated", id)));
        }
        Ok(community)
    }
}

/// An accepted claim: the record to append and, when the record kind is
/// mirrored, the payload to dispatch after commit.
#[derive(Clone, Debug)]
pub struct Resolved<R> {
    pub record: R,
    pub mirror: Option<MirrorPayload>,
}

/// One resolver per claim kind.
pub trait ClaimResolver {
    type Claim;
    type Record;

    fn kind(&self) -> ClaimKind;

    /// Role the claimant must hold in the claim's community.
    fn required_role(&self) -> Role;

    fn community(&self, claim: &Self::Claim) -> CommunityId;

    fn claimant<'c>(&self, claim: &'c Self::Claim) -> &'c Identity;

    fn check_reference(&self, claim: &Self::Claim, view: &ResolverView<'_>) -> Result<(), EngineError>;

    fn check_content(&self, claim: &Self::Claim, view: &ResolverView<'_>) -> Result<(), EngineError>;

    /// Build the record. Only called once all checks passed.
    fn build(&self, claim: &Self::Claim, view: &ResolverView<'_>) -> Result<Resolved<Self::Record>, EngineError>;
}

/// Resolve a claim.
pub fn resolve<R: ClaimResolver>(
    resolver: &R,
    claim: &R::Claim,
    view: &ResolverView<'_>,
) -> Result<Resolved<R::Record>, EngineError> {
    let mut ctx = ResolutionContext::new(
        resolver.kind(),
        resolver.community(claim),
        resolver.claimant(claim).clone(),
    );
    resolve_in(resolver, claim, view, &mut ctx)
}

/// Resolve a claim, recording each check into `ctx`.
pub fn resolve_in<R: ClaimResolver>(
    resolver: &R,
    claim: &R::Claim,
    view: &ResolverView<'_>,
    ctx: &mut ResolutionContext,
) -> Result<Resolved<R::Record>, EngineError> {
    for check in Check::ORDER {
        let result = match check {
            Check::Identity => check_identity(resolver.required_role(), ctx, view),
            Check::Reference => resolver.check_reference(claim, view),
            Check::Content => resolver.check_content(claim, view),
        };
        debug!(kind = %ctx.kind, community = %ctx.community, ?check, ok = result.is_ok(), "Check evaluated");
        ctx.record_check(check, CheckResult::from(result.clone()));

        if let Err(e) = result {
            warn!(
                kind = %ctx.kind,
                community = %ctx.community,
                claimant = %ctx.claimant,
                ?check,
                code = e.code(),
                "Claim rejected"
            );
            return Err(e);
        }
    }
    resolver.build(claim, view)
}

/// Unknown communities fail here too, so an outsider learns nothing about
/// which communities exist.
fn check_identity(
    role: Role,
    ctx: &ResolutionContext,
    view: &ResolverView<'_>,
) -> Result<(), EngineError> {
    if view.registry.has_role(&ctx.community, &ctx.claimant, role) {
        Ok(())
    } else {
        Err(EngineError::unauthorized(&ctx.claimant, role.requirement()))
    }
}

pub(crate) fn check_evidence(evidence: &[String]) -> Result<(), EngineError> {
    match evidence.iter().position(|e| e.trim().is_empty()) {
        Some(index) => Err(EngineError::InvalidContent(format!(
            "evidence reference {} is blank",
            index
        ))),
        None => Ok(()),
    }
}
