use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use greengoods_types::{Identity, MirrorProjectId, MirrorRecordId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::environment::EnvironmentEntry;
use crate::error::MirrorError;
use crate::payload::{MirrorPayload, ProjectRequest};
use crate::traits::ExternalRegistry;

/// Why a mirror call was not attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The deployment environment has no mirroring.
    Unavailable,
    /// The community has no mirror project yet.
    NoProject,
}

/// Result of a best-effort mirror call. Failures are values here; nothing in
/// the adapter returns `Err`.
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorOutcome<T> {
    Skipped(SkipReason),
    Completed(T),
    Failed(MirrorError),
}

impl<T> MirrorOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, MirrorOutcome::Completed(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MirrorOutcome::Failed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            MirrorOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Outcome of an admin grant that went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminGrant {
    Granted,
    /// The registry already listed the identity as admin; nothing was sent.
    AlreadyAdmin,
}

/// Project-Mirror Adapter.
///
/// Wraps every external call in failure isolation: a timeout, panic capture
/// and error capture. Callers receive a `MirrorOutcome` and decide which event
/// to emit.
pub struct ProjectMirrorAdapter {
    environment: Option<EnvironmentEntry>,
    registry: Arc<dyn ExternalRegistry>,
    timeout: Duration,
}

impl ProjectMirrorAdapter {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// `environment` is the resolved entry for this deployment; `None` (or an
    /// entry with mirroring off) turns every call into a skip.
    pub fn new(environment: Option<EnvironmentEntry>, registry: Arc<dyn ExternalRegistry>) -> Self {
        Self {
            environment: environment.filter(|e| e.mirroring_available),
            registry,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_available(&self) -> bool {
        self.environment.is_some()
    }

    pub fn environment(&self) -> Option<&EnvironmentEntry> {
        self.environment.as_ref()
    }

    /// Create the community's mirror project.
    pub async fn create_project(&self, request: &ProjectRequest) -> MirrorOutcome<MirrorProjectId> {
        if !self.is_available() {
            return MirrorOutcome::Skipped(SkipReason::Unavailable);
        }

        let registry = self.registry.clone();
        let outcome = self
            .isolated("create_project", async move { registry.create_project(request).await })
            .await;

        match &outcome {
            MirrorOutcome::Completed(project) => {
                info!(community = %request.community, project = %project, "Mirror project created");
            }
            MirrorOutcome::Failed(e) => {
                warn!(community = %request.community, error = %e, "Mirror project creation failed");
            }
            MirrorOutcome::Skipped(_) => {}
        }
        outcome
    }

    /// Create a record under the community's project.
    pub async fn record(
        &self,
        project: Option<&MirrorProjectId>,
        payload: &MirrorPayload,
    ) -> MirrorOutcome<MirrorRecordId> {
        if !self.is_available() {
            debug!(source = %payload.source, "Mirroring unavailable, skipping");
            return MirrorOutcome::Skipped(SkipReason::Unavailable);
        }
        let Some(project) = project else {
            debug!(source = %payload.source, "No mirror project, skipping");
            return MirrorOutcome::Skipped(SkipReason::NoProject);
        };

        let registry = self.registry.clone();
        let outcome = self
            .isolated("create_project_update", async move {
                registry.create_project_update(project, payload).await
            })
            .await;

        match &outcome {
            MirrorOutcome::Completed(record) => {
                info!(source = %payload.source, project = %project, record = %record, "Mirror record created");
            }
            MirrorOutcome::Failed(e) => {
                warn!(source = %payload.source, project = %project, error = %e, "Mirror dispatch failed");
            }
            MirrorOutcome::Skipped(_) => {}
        }
        outcome
    }

    /// Grant project admin to `admin`, skipping the grant when the registry
    /// already lists it.
    pub async fn grant_admin(
        &self,
        project: Option<&MirrorProjectId>,
        admin: &Identity,
    ) -> MirrorOutcome<AdminGrant> {
        if !self.is_available() {
            return MirrorOutcome::Skipped(SkipReason::Unavailable);
        }
        let Some(project) = project else {
            return MirrorOutcome::Skipped(SkipReason::NoProject);
        };

        let registry = self.registry.clone();
        let outcome = self
            .isolated("grant_admin", async move {
                if registry.is_project_admin(project, admin).await? {
                    return Ok(AdminGrant::AlreadyAdmin);
                }
                registry.add_project_admin(project, admin).await?;
                Ok::<_, MirrorError>(AdminGrant::Granted)
            })
            .await;

        match &outcome {
            MirrorOutcome::Completed(grant) => {
                info!(project = %project, admin = %admin, ?grant, "Mirror admin grant");
            }
            MirrorOutcome::Failed(e) => {
                warn!(project = %project, admin = %admin, error = %e, "Mirror admin grant failed");
            }
            MirrorOutcome::Skipped(_) => {}
        }
        outcome
    }

    async fn isolated<T, F>(&self, operation: &str, call: F) -> MirrorOutcome<T>
    where
        F: Future<Output = Result<T, MirrorError>>,
    {
        let guarded = AssertUnwindSafe(call).catch_unwind();
        match tokio::time::timeout(self.timeout, guarded).await {
            Err(_elapsed) => MirrorOutcome::Failed(MirrorError::Timeout(self.timeout)),
            Ok(Err(_panic)) => MirrorOutcome::Failed(MirrorError::Panicked(operation.to_string())),
            Ok(Ok(Err(e))) => MirrorOutcome::Failed(e),
            Ok(Ok(Ok(value))) => MirrorOutcome::Completed(value),
        }
    }
}
