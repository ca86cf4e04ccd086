use greengoods_types::{ActionId, CommunityId, Identity};
use thiserror::Error;

/// Errors from the capability registry and action catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("community not found: {0}")]
    CommunityNotFound(CommunityId),

    #[error("community already registered: {0}")]
    CommunityExists(CommunityId),

    #[error("community {0} is deactivated")]
    Deactivated(CommunityId),

    #[error("{identity} may not manage {community}")]
    NotAuthorized {
        identity: Identity,
        community: CommunityId,
    },

    #[error("invalid community: {0}")]
    InvalidCommunity(String),

    #[error("the owner of {0} cannot be removed as approver")]
    OwnerRemoval(CommunityId),

    #[error("mirror project already set for {0}")]
    MirrorProjectAlreadySet(CommunityId),

    #[error("action not found: {0}")]
    ActionNotFound(ActionId),

    #[error("invalid action definition: {0}")]
    InvalidAction(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authorized_display() {
        let err = RegistryError::NotAuthorized {
            identity: Identity::new("0xdead"),
            community: CommunityId::new(),
        };
        assert!(err.to_string().contains("0xdead"));
    }
}
