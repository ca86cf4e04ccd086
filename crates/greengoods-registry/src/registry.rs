use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use greengoods_types::{CommunityId, Identity, MirrorProjectId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::community::{Community, Role};
use crate::error::RegistryError;

/// Parameters for registering a community.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCommunity {
    pub name: String,
    pub owner: Identity,
    pub token: String,
    #[serde(default)]
    pub members: BTreeSet<Identity>,
    #[serde(default)]
    pub approvers: BTreeSet<Identity>,
}

impl NewCommunity {
    pub fn new(name: impl Into<String>, owner: impl Into<Identity>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            token: token.into(),
            members: BTreeSet::new(),
            approvers: BTreeSet::new(),
        }
    }

    pub fn member(mut self, identity: impl Into<Identity>) -> Self {
        self.members.insert(identity.into());
        self
    }

    pub fn approver(mut self, identity: impl Into<Identity>) -> Self {
        self.approvers.insert(identity.into());
        self
    }
}

/// Capability Registry: who holds which role in which community.
///
/// Lookups for unknown communities answer `false` rather than erroring, so a
/// role check never reveals whether a community exists.
pub struct CapabilityRegistry {
    communities: HashMap<CommunityId, Community>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            communities: HashMap::new(),
        }
    }

    /// Register a community bound to the given implementation version.
    pub fn register(
        &mut self,
        spec: NewCommunity,
        implementation: u32,
        now: DateTime<Utc>,
    ) -> Result<CommunityId, RegistryError> {
        if spec.name.trim().is_empty() {
            return Err(RegistryError::InvalidCommunity("name is required".into()));
        }
        if spec.owner.is_empty() {
            return Err(RegistryError::InvalidCommunity("owner is required".into()));
        }

        let id = CommunityId::new();
        if self.communities.contains_key(&id) {
            return Err(RegistryError::CommunityExists(id));
        }

        let community = Community {
            id,
            name: spec.name,
            owner: spec.owner,
            token: spec.token,
            members: spec.members,
            approvers: spec.approvers,
            mirror_project_id: None,
            active: true,
            implementation,
            created_at: now,
        };

        info!(
            community = %id,
            owner = %community.owner,
            members = community.members.len(),
            approvers = community.approvers.len(),
            implementation,
            "Community registered"
        );

        self.communities.insert(id, community);
        Ok(id)
    }

    pub fn community(&self, id: &CommunityId) -> Option<&Community> {
        self.communities.get(id)
    }

    pub fn communities(&self) -> Vec<&Community> {
        let mut all: Vec<&Community> = self.communities.values().collect();
        all.sort_by_key(|c| c.created_at);
        all
    }

    pub fn is_member(&self, community: &CommunityId, identity: &Identity) -> bool {
        self.has_role(community, identity, Role::Member)
    }

    pub fn is_approver(&self, community: &CommunityId, identity: &Identity) -> bool {
        self.has_role(community, identity, Role::Approver)
    }

    pub fn has_role(&self, community: &CommunityId, identity: &Identity, role: Role) -> bool {
        self.communities
            .get(community)
            .map(|c| c.has_role(identity, role))
            .unwrap_or(false)
    }

    /// Add a member. Returns `false` if the identity already was one.
    pub fn add_member(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
        identity: Identity,
    ) -> Result<bool, RegistryError> {
        let c = self.managed_mut(caller, community)?;
        let added = c.members.insert(identity.clone());
        if added {
            info!(community = %community, member = %identity, by = %caller, "Member added");
        }
        Ok(added)
    }

    /// Add an approver. Returns `false` if the identity already was one.
    pub fn add_approver(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
        identity: Identity,
    ) -> Result<bool, RegistryError> {
        let c = self.managed_mut(caller, community)?;
        let added = c.approvers.insert(identity.clone());
        if added {
            info!(community = %community, approver = %identity, by = %caller, "Approver added");
        }
        Ok(added)
    }

    pub fn remove_member(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
        identity: &Identity,
    ) -> Result<bool, RegistryError> {
        let c = self.managed_mut(caller, community)?;
        let removed = c.members.remove(identity);
        if removed {
            warn!(community = %community, member = %identity, by = %caller, "Member removed");
        }
        Ok(removed)
    }

    pub fn remove_approver(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
        identity: &Identity,
    ) -> Result<bool, RegistryError> {
        let c = self.managed_mut(caller, community)?;
        if c.owner == *identity && c.approvers.contains(identity) {
            return Err(RegistryError::OwnerRemoval(*community));
        }
        let removed = c.approvers.remove(identity);
        if removed {
            warn!(community = %community, approver = %identity, by = %caller, "Approver removed");
        }
        Ok(removed)
    }

    /// Deactivate a community. Owner only; its records stay queryable.
    pub fn deactivate(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
    ) -> Result<(), RegistryError> {
        let c = self
            .communities
            .get_mut(community)
            .ok_or(RegistryError::CommunityNotFound(*community))?;
        if c.owner != *caller {
            return Err(RegistryError::NotAuthorized {
                identity: caller.clone(),
                community: *community,
            });
        }
        c.active = false;
        warn!(community = %community, "Community deactivated");
        Ok(())
    }

    /// Record the community's mirror project. Set once.
    pub fn set_mirror_project(
        &mut self,
        community: &CommunityId,
        project: MirrorProjectId,
    ) -> Result<(), RegistryError> {
        let c = self
            .communities
            .get_mut(community)
            .ok_or(RegistryError::CommunityNotFound(*community))?;
        if c.mirror_project_id.is_some() {
            return Err(RegistryError::MirrorProjectAlreadySet(*community));
        }
        c.mirror_project_id = Some(project);
        Ok(())
    }

    /// Point a community at another implementation version. Authority and
    /// layout checks belong to the caller.
    pub fn rebind(&mut self, community: &CommunityId, implementation: u32) -> Result<u32, RegistryError> {
        let c = self
            .communities
            .get_mut(community)
            .ok_or(RegistryError::CommunityNotFound(*community))?;
        let previous = c.implementation;
        c.implementation = implementation;
        Ok(previous)
    }

    fn managed_mut(
        &mut self,
        caller: &Identity,
        community: &CommunityId,
    ) -> Result<&mut Community, RegistryError> {
        let c = self
            .communities
            .get_mut(community)
            .ok_or(RegistryError::CommunityNotFound(*community))?;
        if !c.can_manage(caller) {
            return Err(RegistryError::NotAuthorized {
                identity: caller.clone(),
                community: *community,
            });
        }
        if !c.active {
            return Err(RegistryError::Deactivated(*community));
        }
        Ok(c)
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s)
    }

    fn setup() -> (CapabilityRegistry, CommunityId) {
        let mut registry = CapabilityRegistry::new();
        let cid = registry
            .register(
                NewCommunity::new("Rio Claro", "0xowner", "0xtoken")
                    .member("0xa")
                    .approver("0xb"),
                1,
                Utc::now(),
            )
            .unwrap();
        (registry, cid)
    }

    #[test]
    fn lookups() {
        let (registry, cid) = setup();
        assert!(registry.is_member(&cid, &id("0xA")));
        assert!(registry.is_approver(&cid, &id("0xb")));
        assert!(!registry.is_approver(&cid, &id("0xa")));
    }

    #[test]
    fn unknown_community_answers_false() {
        let (registry, _) = setup();
        assert!(!registry.is_member(&CommunityId::new(), &id("0xa")));
    }

    #[test]
    fn reject_empty_name() {
        let mut registry = CapabilityRegistry::new();
        let err = registry
            .register(NewCommunity::new("  ", "0xowner", "t"), 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidCommunity(_)));
    }

    #[test]
    fn approver_can_add_member() {
        let (mut registry, cid) = setup();
        assert!(registry.add_member(&id("0xb"), &cid, id("0xc")).unwrap());
        assert!(registry.is_member(&cid, &id("0xc")));
        // second add is a no-op
        assert!(!registry.add_member(&id("0xb"), &cid, id("0xc")).unwrap());
    }

    #[test]
    fn member_cannot_add_approver() {
        let (mut registry, cid) = setup();
        let err = registry.add_approver(&id("0xa"), &cid, id("0xa")).unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));
        assert!(!registry.is_approver(&cid, &id("0xa")));
    }

    #[test]
    fn remove_roles() {
        let (mut registry, cid) = setup();
        assert!(registry.remove_member(&id("0xowner"), &cid, &id("0xa")).unwrap());
        assert!(!registry.is_member(&cid, &id("0xa")));
        assert!(registry.remove_approver(&id("0xowner"), &cid, &id("0xb")).unwrap());
        assert!(!registry.is_approver(&cid, &id("0xb")));
    }

    #[test]
    fn owner_keeps_approver_role() {
        let (mut registry, cid) = setup();
        // not an approver yet: nothing to remove
        assert!(!registry.remove_approver(&id("0xb"), &cid, &id("0xowner")).unwrap());

        registry.add_approver(&id("0xowner"), &cid, id("0xowner")).unwrap();
        let err = registry
            .remove_approver(&id("0xb"), &cid, &id("0xowner"))
            .unwrap_err();
        assert_eq!(err, RegistryError::OwnerRemoval(cid));
        assert!(registry.is_approver(&cid, &id("0xowner")));
    }

    #[test]
    fn only_owner_deactivates() {
        let (mut registry, cid) = setup();
        assert!(registry.deactivate(&id("0xb"), &cid).is_err());
        registry.deactivate(&id("0xowner"), &cid).unwrap();
        assert!(!registry.community(&cid).unwrap().active);

        let err = registry.add_member(&id("0xowner"), &cid, id("0xd")).unwrap_err();
        assert_eq!(err, RegistryError::Deactivated(cid));
    }

    #[test]
    fn mirror_project_set_once() {
        let (mut registry, cid) = setup();
        registry
            .set_mirror_project(&cid, MirrorProjectId("p1".into()))
            .unwrap();
        let err = registry
            .set_mirror_project(&cid, MirrorProjectId("p2".into()))
            .unwrap_err();
        assert_eq!(err, RegistryError::MirrorProjectAlreadySet(cid));
        assert_eq!(
            registry.community(&cid).unwrap().mirror_project_id,
            Some(MirrorProjectId("p1".into()))
        );
    }

    #[test]
    fn rebind_returns_previous_version() {
        let (mut registry, cid) = setup();
        assert_eq!(registry.rebind(&cid, 2).unwrap(), 1);
        assert_eq!(registry.community(&cid).unwrap().implementation, 2);
    }
}
