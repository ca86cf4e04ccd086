use async_trait::async_trait;
use greengoods_types::{Identity, MirrorProjectId, MirrorRecordId};

use crate::error::MirrorError;
use crate::payload::{MirrorPayload, ProjectRequest};

/// The external accountability registry.
///
/// Implemented by the on-chain client in deployments; use
/// `MockExternalRegistry` for testing.
#[async_trait]
pub trait ExternalRegistry: Send + Sync {
    /// Create the per-community project.
    async fn create_project(&self, request: &ProjectRequest) -> Result<MirrorProjectId, MirrorError>;

    /// Create a record ("project update") under project X.
    async fn create_project_update(
        &self,
        project: &MirrorProjectId,
        payload: &MirrorPayload,
    ) -> Result<MirrorRecordId, MirrorError>;

    /// Grant administrative rights on project X.
    async fn add_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<(), MirrorError>;

    /// Is Y an admin of project X.
    async fn is_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<bool, MirrorError>;
}
