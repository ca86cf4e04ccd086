use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use greengoods_registry::Community;
use greengoods_types::{CommunityId, Identity};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::EngineError;

/// Behavioural knobs of a resolver set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverPolicy {
    /// Reject a second Approval for an already-decided Submission instead of
    /// accepting it as the new canonical decision.
    #[serde(default)]
    pub reject_duplicate_approvals: bool,
    /// Minimum number of evidence references a Submission must carry.
    #[serde(default)]
    pub min_submission_evidence: usize,
}

/// A versionable unit of resolver logic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSet {
    pub label: String,
    #[serde(default)]
    pub policy: ResolverPolicy,
}

impl ResolverSet {
    pub fn new(label: impl Into<String>, policy: ResolverPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
        }
    }
}

impl Default for ResolverSet {
    fn default() -> Self {
        Self::new("genesis", ResolverPolicy::default())
    }
}

/// Ordered field layout of the community record an implementation expects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldLayout(Vec<String>);

impl FieldLayout {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    /// Layout of the community record as first deployed. Mirrors the fields
    /// of [`Community`] in declaration order.
    pub fn genesis() -> Self {
        Self::new([
            "id",
            "name",
            "owner",
            "token",
            "members",
            "approvers",
            "mirror_project_id",
            "active",
            "implementation",
            "created_at",
        ])
    }

    /// This layout with `fields` appended.
    pub fn extended<I, S>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = self.0.clone();
        next.extend(fields.into_iter().map(Into::into));
        Self(next)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for field in &self.0 {
            if field.trim().is_empty() {
                return Err("layout contains an empty field name".into());
            }
            if !seen.insert(field.as_str()) {
                return Err(format!("layout repeats field '{}'", field));
            }
        }
        Ok(())
    }

    /// `next` may only append: every current field must keep its position.
    pub fn check_successor(&self, next: &FieldLayout) -> Result<(), String> {
        if next.0.len() < self.0.len() {
            return Err(format!(
                "target layout drops fields ({} < {})",
                next.0.len(),
                self.0.len()
            ));
        }
        for (position, (current, target)) in self.0.iter().zip(next.0.iter()).enumerate() {
            if current != target {
                return Err(format!(
                    "field {} is '{}' but target layout has '{}'",
                    position, current, target
                ));
            }
        }
        Ok(())
    }
}

/// A published, immutable implementation: resolver logic plus layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub version: u32,
    pub resolver_set: ResolverSet,
    pub layout: FieldLayout,
    pub published_at: DateTime<Utc>,
}

/// One rebind of one community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub community: CommunityId,
    pub from: u32,
    pub to: u32,
    pub by: Identity,
    pub at: DateTime<Utc>,
}

/// Upgrade Coordinator.
///
/// Publishing an implementation never touches existing bindings; only new
/// communities and explicit migrations pick it up. Communities that never
/// migrate keep resolving against the implementation they were created with.
pub struct UpgradeCoordinator {
    genesis: Implementation,
    /// Versions 2.. in publication order.
    successors: Vec<Implementation>,
    history: HashMap<CommunityId, Vec<MigrationRecord>>,
}

impl UpgradeCoordinator {
    pub const GENESIS_VERSION: u32 = 1;

    pub fn new(genesis: ResolverSet, now: DateTime<Utc>) -> Self {
        Self {
            genesis: Implementation {
                version: Self::GENESIS_VERSION,
                resolver_set: genesis,
                layout: FieldLayout::genesis(),
                published_at: now,
            },
            successors: Vec::new(),
            history: HashMap::new(),
        }
    }

    /// Publish a new implementation and return its version.
    pub fn publish(
        &mut self,
        resolver_set: ResolverSet,
        layout: FieldLayout,
        now: DateTime<Utc>,
    ) -> Result<u32, EngineError> {
        layout.validate().map_err(EngineError::InvalidContent)?;
        if resolver_set.label.trim().is_empty() {
            return Err(EngineError::InvalidContent("resolver set label is required".into()));
        }

        let version = self.latest().version + 1;
        info!(version, label = %resolver_set.label, fields = layout.fields().len(), "Implementation published");

        self.successors.push(Implementation {
            version,
            resolver_set,
            layout,
            published_at: now,
        });
        Ok(version)
    }

    pub fn latest(&self) -> &Implementation {
        self.successors.last().unwrap_or(&self.genesis)
    }

    pub fn implementation(&self, version: u32) -> Option<&Implementation> {
        match version {
            Self::GENESIS_VERSION => Some(&self.genesis),
            v if v > Self::GENESIS_VERSION => self.successors.get((v - 2) as usize),
            _ => None,
        }
    }

    pub fn implementations(&self) -> impl Iterator<Item = &Implementation> {
        std::iter::once(&self.genesis).chain(self.successors.iter())
    }

    /// Validate a migration without applying it. Fails closed.
    pub fn plan_migration(
        &self,
        community: &Community,
        caller: &Identity,
        target: u32,
        now: DateTime<Utc>,
    ) -> Result<MigrationRecord, EngineError> {
        if community.owner != *caller {
            warn!(community = %community.id, caller = %caller, "Migration refused: not owner");
            return Err(EngineError::IncompatibleMigration(format!(
                "{} is not the owner of {}",
                caller, community.id
            )));
        }
        if community.implementation == target {
            return Err(EngineError::IncompatibleMigration(format!(
                "{} is already bound to v{}",
                community.id, target
            )));
        }

        let current = self.implementation(community.implementation).ok_or_else(|| {
            EngineError::IncompatibleMigration(format!(
                "current implementation v{} is unknown",
                community.implementation
            ))
        })?;
        let next = self.implementation(target).ok_or_else(|| {
            EngineError::IncompatibleMigration(format!("target implementation v{} is unknown", target))
        })?;

        current.layout.check_successor(&next.layout).map_err(|reason| {
            warn!(community = %community.id, from = current.version, to = target, %reason, "Migration refused: layout");
            EngineError::IncompatibleMigration(reason)
        })?;

        Ok(MigrationRecord {
            community: community.id,
            from: current.version,
            to: target,
            by: caller.clone(),
            at: now,
        })
    }

    pub fn record_migration(&mut self, record: MigrationRecord) {
        info!(community = %record.community, from = record.from, to = record.to, "Community migrated");
        self.history.entry(record.community).or_default().push(record);
    }

    pub fn history(&self, community: &CommunityId) -> &[MigrationRecord] {
        self.history
            .get(community)
            .map(|h| h.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn community(implementation: u32) -> Community {
        Community {
            id: CommunityId::new(),
            name: "Rio Claro".into(),
            owner: Identity::new("0xowner"),
            token: "0xtoken".into(),
            members: BTreeSet::new(),
            approvers: BTreeSet::new(),
            mirror_project_id: None,
            active: true,
            implementation,
            created_at: Utc::now(),
        }
    }

    fn strict() -> ResolverSet {
        ResolverSet::new(
            "strict-approvals",
            ResolverPolicy {
                reject_duplicate_approvals: true,
                min_submission_evidence: 0,
            },
        )
    }

    #[test]
    fn genesis_layout_covers_community_record() {
        let json = serde_json::to_value(community(1)).unwrap();
        let mut record_fields: Vec<String> = json.as_object().unwrap().keys().cloned().collect();
        let mut layout_fields = FieldLayout::genesis().fields().to_vec();
        record_fields.sort();
        layout_fields.sort();
        assert_eq!(layout_fields, record_fields);
    }

    #[test]
    fn publish_assigns_next_version() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        let v2 = coordinator
            .publish(strict(), FieldLayout::genesis().extended(["domain"]), Utc::now())
            .unwrap();
        assert_eq!(v2, 2);
        assert_eq!(coordinator.latest().version, 2);
        assert_eq!(coordinator.implementation(1).unwrap().resolver_set.label, "genesis");
    }

    #[test]
    fn publish_rejects_repeated_field() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        let err = coordinator
            .publish(strict(), FieldLayout::genesis().extended(["owner"]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidContent(_)));
    }

    #[test]
    fn owner_can_plan_append_only_migration() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        coordinator
            .publish(strict(), FieldLayout::genesis().extended(["domain"]), Utc::now())
            .unwrap();
        let c = community(1);
        let record = coordinator
            .plan_migration(&c, &Identity::new("0xowner"), 2, Utc::now())
            .unwrap();
        assert_eq!((record.from, record.to), (1, 2));
    }

    #[test]
    fn non_owner_fails_closed() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        coordinator
            .publish(strict(), FieldLayout::genesis(), Utc::now())
            .unwrap();
        let err = coordinator
            .plan_migration(&community(1), &Identity::new("0xapprover"), 2, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::IncompatibleMigration(_)));
    }

    #[test]
    fn reordered_layout_rejected() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        let mut fields: Vec<String> = FieldLayout::genesis().fields().to_vec();
        fields.swap(1, 2);
        coordinator
            .publish(strict(), FieldLayout::new(fields), Utc::now())
            .unwrap();
        let err = coordinator
            .plan_migration(&community(1), &Identity::new("0xowner"), 2, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("field 1"));
    }

    #[test]
    fn unknown_target_rejected() {
        let coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        let err = coordinator
            .plan_migration(&community(1), &Identity::new("0xowner"), 7, Utc::now())
            .unwrap_err();
        assert!(err.to_string().contains("v7"));
    }

    #[test]
    fn history_is_append_only() {
        let mut coordinator = UpgradeCoordinator::new(ResolverSet::default(), Utc::now());
        let c = community(1);
        assert!(coordinator.history(&c.id).is_empty());
        coordinator.record_migration(MigrationRecord {
            community: c.id,
            from: 1,
            to: 2,
            by: c.owner.clone(),
            at: Utc::now(),
        });
        assert_eq!(coordinator.history(&c.id).len(), 1);
    }

    fn field_names() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::btree_set("[a-z]{1,8}", 1..10)
            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn appending_is_always_compatible(base in field_names(), extra in field_names()) {
            let current = FieldLayout::new(base.clone());
            let next = current.extended(extra);
            prop_assert!(current.check_successor(&next).is_ok());
        }

        #[test]
        fn dropping_a_field_is_never_compatible(base in field_names(), drop in any::<prop::sample::Index>()) {
            let current = FieldLayout::new(base.clone());
            let mut fields = base;
            fields.remove(drop.index(fields.len()));
            prop_assert!(current.check_successor(&FieldLayout::new(fields)).is_err());
        }

        #[test]
        fn swapping_distinct_fields_is_never_compatible(base in field_names(), a in any::<prop::sample::Index>(), b in any::<prop::sample::Index>()) {
            let (i, j) = (a.index(base.len()), b.index(base.len()));
            prop_assume!(i != j);
            let current = FieldLayout::new(base.clone());
            let mut fields = base;
            fields.swap(i, j);
            prop_assert!(current.check_successor(&FieldLayout::new(fields)).is_err());
        }
    }
}
