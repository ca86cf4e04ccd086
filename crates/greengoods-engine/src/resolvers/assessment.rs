use greengoods_mirror::MirrorPayload;
use greengoods_registry::Role;
use greengoods_types::{
    Assessment, AssessmentClaim, AssessmentId, AssessmentKind, Capital, CommunityId, Identity,
};

use super::{check_evidence, ClaimResolver, Resolved, ResolverView};
use crate::context::ClaimKind;
use crate::error::EngineError;

/// Periodic evaluation authored by a current approver.
pub struct AssessmentResolver;

/// Parse the raw kind and capital tags. Capitals come back sorted and deduplicated.
fn parse_tags(claim: &AssessmentClaim) -> Result<(AssessmentKind, Vec<Capital>), EngineError> {
    let kind: AssessmentKind = claim
        .kind
        .parse()
        .map_err(|e: greengoods_types::UnknownVariant| EngineError::InvalidContent(e.to_string()))?;

    if claim.capitals.is_empty() {
        return Err(EngineError::InvalidContent("at least one capital is required".into()));
    }
    let mut capitals = claim
        .capitals
        .iter()
        .map(|tag| tag.parse::<Capital>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::InvalidContent(e.to_string()))?;
    capitals.sort();
    capitals.dedup();

    Ok((kind, capitals))
}

impl ClaimResolver for AssessmentResolver {
    type Claim = AssessmentClaim;
    type Record = Assessment;

    fn kind(&self) -> ClaimKind {
        ClaimKind::Assessment
    }

    fn required_role(&self) -> Role {
        Role::Approver
    }

    fn community(&self, claim: &AssessmentClaim) -> CommunityId {
        claim.community
    }

    fn claimant<'c>(&self, claim: &'c AssessmentClaim) -> &'c Identity {
        &claim.author
    }

    fn check_reference(&self, claim: &AssessmentClaim, view: &ResolverView<'_>) -> Result<(), EngineError> {
        view.active_community(&claim.community).map(|_| ())
    }

    fn check_content(&self, claim: &AssessmentClaim, _view: &ResolverView<'_>) -> Result<(), EngineError> {
        if claim.title.trim().is_empty() {
            return Err(EngineError::InvalidContent("title is required".into()));
        }
        if claim.description.trim().is_empty() {
            return Err(EngineError::InvalidContent("description is required".into()));
        }
        parse_tags(claim)?;
        check_evidence(&claim.evidence)?;
        if let Some(period) = claim.period {
            if period.end < period.start {
                return Err(EngineError::InvalidContent(
                    "reporting period ends before it starts".into(),
                ));
            }
        }
        Ok(())
    }

    fn build(&self, claim: &AssessmentClaim, view: &ResolverView<'_>) -> Result<Resolved<Assessment>, EngineError> {
        let (kind, capitals) = parse_tags(claim)?;
        let assessment = Assessment {
            id: AssessmentId::new(),
            community: claim.community,
            author: claim.author.clone(),
            title: claim.title.trim().to_string(),
            description: claim.description.clone(),
            kind,
            capitals,
            metrics_ref: claim.metrics_ref.clone(),
            evidence: claim.evidence.clone(),
            period: claim.period,
            created_at: view.now,
        };
        let mirror = Some(MirrorPayload::from_assessment(&assessment));
        Ok(Resolved {
            record: assessment,
            mirror,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Check, ResolutionContext};
    use crate::resolvers::fixtures::World;
    use crate::resolvers::{resolve, resolve_in};
    use chrono::{Duration, Utc};
    use greengoods_types::ReportingPeriod;

    fn claim(world: &World, author: &str) -> AssessmentClaim {
        AssessmentClaim::new(world.community, author, "Q1 soil survey", "soil")
            .description("Organic matter up 2%")
            .capital("Living")
            .metrics_ref("ipfs://metrics")
            .evidence("ipfs://samples")
    }

    #[test]
    fn approver_records_assessment() {
        let world = World::new();
        let claim = claim(&world, "0xb").capital("social").capital("LIVING");

        let resolved = resolve(&AssessmentResolver, &claim, &world.view()).unwrap();
        assert_eq!(resolved.record.kind, AssessmentKind::Soil);
        assert_eq!(resolved.record.capitals, vec![Capital::Living, Capital::Social]);
        let payload = resolved.mirror.unwrap();
        assert_eq!(payload.title, "Q1 soil survey");
        assert_eq!(payload.evidence.as_deref(), Some("ipfs://samples"));
    }

    #[test]
    fn member_rejected_even_with_empty_capitals() {
        let world = World::new();
        let mut claim = claim(&world, "0xa");
        claim.capitals.clear();

        let mut ctx = ResolutionContext::new(ClaimKind::Assessment, world.community, claim.author.clone());
        let err = resolve_in(&AssessmentResolver, &claim, &world.view(), &mut ctx).unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(ctx.evaluated(), vec![Check::Identity]);
    }

    #[test]
    fn empty_capitals_is_invalid_content() {
        let world = World::new();
        let mut claim = claim(&world, "0xb");
        claim.capitals.clear();

        let mut ctx = ResolutionContext::new(ClaimKind::Assessment, world.community, claim.author.clone());
        let err = resolve_in(&AssessmentResolver, &claim, &world.view(), &mut ctx).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONTENT");
        assert_eq!(ctx.evaluated(), Check::ORDER.to_vec());
    }

    #[test]
    fn unknown_capital_named_in_error() {
        let world = World::new();
        let claim = claim(&world, "0xb").capital("Aesthetic");
        let err = resolve(&AssessmentResolver, &claim, &world.view()).unwrap_err();
        assert!(err.to_string().contains("Aesthetic"));
    }

    #[test]
    fn unknown_kind_rejected() {
        let world = World::new();
        let mut claim = claim(&world, "0xb");
        claim.kind = "vibes".into();
        let err = resolve(&AssessmentResolver, &claim, &world.view()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONTENT");
    }

    #[test]
    fn title_and_description_required() {
        let world = World::new();
        let mut no_title = claim(&world, "0xb");
        no_title.title = "  ".into();
        assert!(resolve(&AssessmentResolver, &no_title, &world.view())
            .unwrap_err()
            .to_string()
            .contains("title"));

        let mut no_description = claim(&world, "0xb");
        no_description.description.clear();
        assert!(resolve(&AssessmentResolver, &no_description, &world.view())
            .unwrap_err()
            .to_string()
            .contains("description"));
    }

    #[test]
    fn inverted_period_rejected() {
        let world = World::new();
        let now = Utc::now();
        let claim = claim(&world, "0xb").period(ReportingPeriod {
            start: now,
            end: now - Duration::days(90),
        });
        let err = resolve(&AssessmentResolver, &claim, &world.view()).unwrap_err();
        assert!(err.to_string().contains("reporting period"));
    }
}
