//! Mirror project setup racing other engine calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use greengoods_engine::{AttestationEngine, EngineConfig, EngineEvent};
use greengoods_mirror::{
    EnvironmentEntry, EnvironmentTable, ExternalRegistry, MirrorError, MirrorPayload,
    MockExternalRegistry, MockMode, ProjectRequest, RegistryCall,
};
use greengoods_registry::NewCommunity;
use greengoods_types::{CommunityId, Identity, MirrorProjectId, MirrorRecordId};
use tokio::sync::Notify;

/// Wraps the mock and, once armed, holds the next `create_project` until
/// released.
struct GatedRegistry {
    inner: MockExternalRegistry,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedRegistry {
    fn new() -> Self {
        Self {
            inner: MockExternalRegistry::new(),
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn project_creations(&self) -> usize {
        self.inner
            .calls()
            .iter()
            .filter(|c| matches!(c, RegistryCall::CreateProject(_)))
            .count()
    }
}

#[async_trait]
impl ExternalRegistry for GatedRegistry {
    async fn create_project(&self, request: &ProjectRequest) -> Result<MirrorProjectId, MirrorError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.create_project(request).await
    }

    async fn create_project_update(
        &self,
        project: &MirrorProjectId,
        payload: &MirrorPayload,
    ) -> Result<MirrorRecordId, MirrorError> {
        self.inner.create_project_update(project, payload).await
    }

    async fn add_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<(), MirrorError> {
        self.inner.add_project_admin(project, admin).await
    }

    async fn is_project_admin(
        &self,
        project: &MirrorProjectId,
        admin: &Identity,
    ) -> Result<bool, MirrorError> {
        self.inner.is_project_admin(project, admin).await
    }
}

fn config() -> EngineConfig {
    EngineConfig {
        environment: "testnet".into(),
        environments: EnvironmentTable::new().with(
            "testnet",
            EnvironmentEntry::available("0xregistry", "0xresolver", "0xproject", "0xupdate"),
        ),
        ..Default::default()
    }
}

/// A community whose first project creation failed, with the registry
/// healthy again and the gate armed for the retry.
async fn community_without_project(
    registry: &Arc<GatedRegistry>,
) -> (AttestationEngine, CommunityId) {
    let engine = AttestationEngine::new(config(), registry.clone()).unwrap();
    registry.inner.set_mode(MockMode::Fail("rpc down".into()));
    let id = engine
        .create_community(NewCommunity::new("Rio Claro", "0xowner", "0xtoken").approver("0xB"))
        .await
        .unwrap();
    assert!(engine.community(&id).unwrap().mirror_project_id.is_none());

    registry.inner.set_mode(MockMode::Succeed);
    registry.arm();
    (engine, id)
}

#[tokio::test]
async fn approver_added_during_project_setup_is_granted_admin() {
    let registry = Arc::new(GatedRegistry::new());
    let (engine, id) = community_without_project(&registry).await;
    let owner = Identity::new("0xowner");

    let (project, added) = tokio::join!(engine.establish_mirror_project(&owner, &id), async {
        registry.entered.notified().await;
        let added = engine.add_approver(&owner, &id, "0xlate").await;
        registry.release.notify_one();
        added
    });

    assert!(added.unwrap());
    let project = project.unwrap().unwrap();
    let admins = registry.inner.admins(&project);
    assert!(admins.contains(&Identity::new("0xlate")));
    assert!(admins.contains(&Identity::new("0xb")));
}

#[tokio::test]
async fn concurrent_setups_create_one_project() {
    let registry = Arc::new(GatedRegistry::new());
    let (engine, id) = community_without_project(&registry).await;
    let before = registry.project_creations();

    let owner = Identity::new("0xowner");
    let (first, second) = tokio::join!(
        engine.establish_mirror_project(&owner, &id),
        async {
            registry.entered.notified().await;
            let second = engine
                .establish_mirror_project(&Identity::new("0xB"), &id)
                .await;
            registry.release.notify_one();
            second
        }
    );

    let project = first.unwrap().unwrap();
    assert_eq!(second.unwrap(), None);
    assert_eq!(registry.project_creations() - before, 1);
    assert_eq!(engine.community(&id).unwrap().mirror_project_id, Some(project.clone()));

    let created = engine
        .events()
        .into_iter()
        .filter(|r| matches!(r.event, EngineEvent::MirrorProjectCreated { .. }))
        .count();
    assert_eq!(created, 1);

    // once stored, later calls return the same project
    assert_eq!(
        engine
            .establish_mirror_project(&Identity::new("0xB"), &id)
            .await
            .unwrap(),
        Some(project)
    );
}
