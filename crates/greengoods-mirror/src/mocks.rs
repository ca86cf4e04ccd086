use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use greengoods_types::{Identity, MirrorProjectId, MirrorRecordId};

use crate::error::MirrorError;
use crate::payload::{MirrorPayload, ProjectRequest};
use crate::traits::ExternalRegistry;

/// How the mock answers calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockMode {
    Succeed,
    /// Every call returns `MirrorError::Registry(reason)`.
    Fail(String),
    /// Every call panics.
    Panic,
    /// Every call never completes.
    Hang,
}

/// A call observed by the mock, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryCall {
    CreateProject(ProjectRequest),
    CreateProjectUpdate {
        project: MirrorProjectId,
        payload: MirrorPayload,
    },
    AddProjectAdmin {
        project: MirrorProjectId,
        admin: Identity,
    },
    IsProjectAdmin {
        project: MirrorProjectId,
        admin: Identity,
    },
}

#[derive(Default)]
struct MockState {
    next_project: u64,
    next_update: u64,
    admins: HashMap<MirrorProjectId, BTreeSet<Identity>>,
    updates: Vec<(MirrorProjectId, MirrorRecordId, MirrorPayload)>,
    calls: Vec<RegistryCall>,
}

/// In-memory external registry for testing.
///
/// The mode can be switched at any time to simulate an outage.
pub struct MockExternalRegistry {
    mode: Mutex<MockMode>,
    state: Mutex<MockState>,
}

impl MockExternalRegistry {
    pub fn new() -> Self {
        Self::with_mode(MockMode::Succeed)
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::with_mode(MockMode::Fail(reason.into()))
    }

    pub fn with_mode(mode: MockMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn set_mode(&self, mode: MockMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state().calls.clone()
    }

    /// Updates created so far, as (project, update id, payload).
    pub fn updates(&self) -> Vec<(MirrorProjectId, MirrorRecordId, MirrorPayload)> {
        self.state().updates.clone()
    }

    pub fn admins(&self, project: &MirrorProjectId) -> BTreeSet<Identity> {
        self.state().admins.get(project).cloned().unwrap_or_default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call, then apply the current failure mode.
    async fn enter(&self, call: RegistryCall) -> Result<(), MirrorError> {
        self.state().calls.push(call);
        let mode = self.mode.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match mode {
            MockMode::Succeed => Ok(()),
            MockMode::Fail(reason) => Err(MirrorError::Registry(reason)),
            MockMode::Panic => panic!("mock registry panic"),
            MockMode::Hang => std::future::pending().await,
        }
    }
}

impl Default for MockExternalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalRegistry for MockExternalRegistry {
    async fn create_project(&self, request: &ProjectRequest) -> Result<MirrorProjectId, MirrorError> {
        self.enter(RegistryCall::CreateProject(request.clone())).await?;
        let mut state = self.state();
        state.next_project += 1;
        let project = MirrorProjectId(format!("proj-{}", state.next_project));
        state
            .admins
            .entry(project.clone())
            .or_default()
            .insert(request.owner.clone());
        Ok(project)
    }

    async fn create_project_update(
        &self,
        project: &MirrorProjectId,
        payload: &MirrorPayload,
    ) -> Result<MirrorRecordId, MirrorError> {
        self.enter(RegistryCall::CreateProjectUpdate {
            project: project.clone(),
            payload: payload.clone(),
        })
        .await?;
        let mut state = self.state();
        if !state.admins.contains_key(project) {
            return Err(MirrorError::Registry(format!("unknown project {}", project)));
        }
        state.next_update += 1;
        let record = MirrorRecordId(format!("upd-{}", state.next_update));
        state
            .updates
            .push((project.clone(), record.clone(), payload.clone()));
        Ok(record)
    }

    async fn add_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<(), MirrorError> {
        self.enter(RegistryCall::AddProjectAdmin {
            project: project.clone(),
            admin: admin.clone(),
        })
        .await?;
        self.state()
            .admins
            .entry(project.clone())
            .or_default()
            .insert(admin.clone());
        Ok(())
    }

    async fn is_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<bool, MirrorError> {
        self.enter(RegistryCall::IsProjectAdmin {
            project: project.clone(),
            admin: admin.clone(),
        })
        .await?;
        Ok(self
            .state()
            .admins
            .get(project)
            .map(|a| a.contains(admin))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greengoods_types::CommunityId;

    fn request() -> ProjectRequest {
        ProjectRequest {
            community: CommunityId::new(),
            title: "Rio Claro".into(),
            description: String::new(),
            owner: Identity::new("0xowner"),
        }
    }

    #[tokio::test]
    async fn owner_is_admin_of_new_project() {
        let mock = MockExternalRegistry::new();
        let project = mock.create_project(&request()).await.unwrap();
        assert!(mock
            .is_project_admin(&project, &Identity::new("0xowner"))
            .await
            .unwrap());
        assert_eq!(mock.calls().len(), 2);
    }

    #[tokio::test]
    async fn failing_mode_records_call() {
        let mock = MockExternalRegistry::failing("rpc down");
        let err = mock.create_project(&request()).await.unwrap_err();
        assert_eq!(err, MirrorError::Registry("rpc down".into()));
        assert_eq!(mock.calls().len(), 1);
    }
}
