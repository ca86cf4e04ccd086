use greengoods_registry::RegistryError;
use greengoods_types::{Identity, RecordRef, SubmissionId};
use thiserror::Error;

/// Errors surfaced to callers of the engine.
///
/// Mirror failures are absent by construction: they are reported as
/// `MirrorDispatchFailed` events and never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The identity lacks the role the operation requires. Carries no
    /// information about the referenced records.
    #[error("unauthorized: {identity} is not {required}")]
    Unauthorized { identity: Identity, required: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("submission {0} already has a decision")]
    AlreadyDecided(SubmissionId),

    #[error("incompatible migration: {0}")]
    IncompatibleMigration(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors specific to the attestation store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate record id: {0}")]
    DuplicateEntry(RecordRef),

    #[error("record not found in store: {0}")]
    NotFound(RecordRef),
}

impl EngineError {
    pub fn unauthorized(identity: &Identity, required: impl Into<String>) -> Self {
        EngineError::Unauthorized {
            identity: identity.clone(),
            required: required.into(),
        }
    }

    /// Stable machine-readable code for logs and clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Unauthorized { .. } => "UNAUTHORIZED",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::InvalidReference(_) => "INVALID_REFERENCE",
            EngineError::InvalidContent(_) => "INVALID_CONTENT",
            EngineError::AlreadyDecided(_) => "ALREADY_DECIDED",
            EngineError::IncompatibleMigration(_) => "INCOMPATIBLE_MIGRATION",
            EngineError::Configuration(_) => "CONFIGURATION",
            EngineError::Registry(_) => "REGISTRY",
            EngineError::Store(_) => "STORE",
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotAuthorized { identity, .. } => EngineError::Unauthorized {
                identity,
                required: "owner or approver".into(),
            },
            RegistryError::CommunityNotFound(id) => EngineError::NotFound(id.to_string()),
            RegistryError::ActionNotFound(id) => EngineError::NotFound(id.to_string()),
            RegistryError::Deactivated(id) => {
                EngineError::InvalidReference(format!("{} is deactivated", id))
            }
            RegistryError::InvalidCommunity(reason) | RegistryError::InvalidAction(reason) => {
                EngineError::InvalidContent(reason)
            }
            other => EngineError::Registry(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greengoods_types::CommunityId;

    #[test]
    fn registry_authority_maps_to_unauthorized() {
        let err: EngineError = RegistryError::NotAuthorized {
            identity: Identity::new("0xa"),
            community: CommunityId::new(),
        }
        .into();
        assert_eq!(err.code(), "UNAUTHORIZED");
    }

    #[test]
    fn unauthorized_message_does_not_name_records() {
        let err = EngineError::unauthorized(&Identity::new("0xa"), "an approver");
        assert_eq!(err.to_string(), "unauthorized: 0xa is not an approver");
    }
}
