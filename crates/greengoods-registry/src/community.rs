use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use greengoods_types::{CommunityId, Identity, MirrorProjectId};
use serde::{Deserialize, Serialize};

/// Role an identity must hold to make a given kind of claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Approver,
}

impl Role {
    /// Phrase used in authorization errors.
    pub fn requirement(&self) -> &'static str {
        match self {
            Role::Member => "a member",
            Role::Approver => "an approver",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Member => f.write_str("member"),
            Role::Approver => f.write_str("approver"),
        }
    }
}

/// A named, owned collection under which claims are made.
///
/// Never deleted. Role sets change through the registry; `mirror_project_id`
/// is set at most once; `implementation` changes only through an owner-gated
/// migration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
    pub owner: Identity,
    /// Community token reference (contract address or token id).
    pub token: String,
    pub members: BTreeSet<Identity>,
    pub approvers: BTreeSet<Identity>,
    pub mirror_project_id: Option<MirrorProjectId>,
    pub active: bool,
    /// Version of the resolver implementation this community is bound to.
    pub implementation: u32,
    pub created_at: DateTime<Utc>,
}

impl Community {
    pub fn has_role(&self, identity: &Identity, role: Role) -> bool {
        match role {
            Role::Member => self.members.contains(identity),
            Role::Approver => self.approvers.contains(identity),
        }
    }

    /// Owner or any current approver.
    pub fn can_manage(&self, identity: &Identity) -> bool {
        self.owner == *identity || self.approvers.contains(identity)
    }
}
