use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use greengoods_mirror::{
    AdminGrant, ExternalRegistry, MirrorOutcome, MirrorPayload, ProjectMirrorAdapter,
    ProjectRequest,
};
use greengoods_registry::{
    ActionCatalog, ActionDefinition, ActionWindow, CapabilityRegistry, Community, NewCommunity,
};
use greengoods_types::{
    ActionId, Approval, ApprovalClaim, ApprovalId, Assessment, AssessmentClaim, AssessmentId,
    Capital, Clock, CommunityId, Identity, MirrorProjectId, RecordRef, Submission,
    SubmissionClaim, SubmissionId, SystemClock,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{EngineEvent, EventLog, EventRecord};
use crate::resolvers::{
    self, ApprovalResolver, AssessmentResolver, ResolverView, SubmissionResolver,
};
use crate::store::{AttestationStore, RecordFilter};
use crate::upgrade::{
    FieldLayout, Implementation, MigrationRecord, ResolverPolicy, ResolverSet, UpgradeCoordinator,
};

/// Everything a claim is validated against and written to. Guarded by one
/// lock so validation and the append are a single atomic step.
struct EngineState {
    registry: CapabilityRegistry,
    catalog: ActionCatalog,
    store: AttestationStore,
    coordinator: UpgradeCoordinator,
    /// Communities whose mirror project creation is awaiting the registry.
    pending_projects: HashSet<CommunityId>,
}

impl EngineState {
    fn view<'a>(&'a self, policy: &'a ResolverPolicy, now: DateTime<Utc>) -> ResolverView<'a> {
        ResolverView {
            registry: &self.registry,
            catalog: &self.catalog,
            store: &self.store,
            policy,
            now,
        }
    }

    /// Policy of the implementation the community is bound to. Unknown
    /// communities get the default; they fail the identity check anyway.
    fn policy_for(&self, community: &CommunityId) -> ResolverPolicy {
        self.registry
            .community(community)
            .and_then(|c| self.coordinator.implementation(c.implementation))
            .map(|i| i.resolver_set.policy.clone())
            .unwrap_or_default()
    }

    fn mirror_project(&self, community: &CommunityId) -> Option<MirrorProjectId> {
        self.registry
            .community(community)
            .and_then(|c| c.mirror_project_id.clone())
    }
}

/// The attestation engine.
///
/// Claims are resolved and recorded under the state lock. Mirror dispatch
/// happens after the lock is released and only ever produces events.
pub struct AttestationEngine {
    state: RwLock<EngineState>,
    events: EventLog,
    mirror: ProjectMirrorAdapter,
    clock: Arc<dyn Clock>,
    environment: String,
}

impl AttestationEngine {
    pub fn new(
        config: EngineConfig,
        registry: Arc<dyn ExternalRegistry>,
    ) -> Result<Self, EngineError> {
        config
            .environments
            .validate()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        if config.mirror.timeout_secs == 0 {
            return Err(EngineError::Configuration(
                "mirror.timeout_secs must be positive".into(),
            ));
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mirror = ProjectMirrorAdapter::new(config.resolved_environment(), registry)
            .with_timeout(config.mirror.timeout());

        info!(
            environment = %config.environment,
            mirroring = mirror.is_available(),
            "Attestation engine initialized"
        );

        Ok(Self {
            state: RwLock::new(EngineState {
                registry: CapabilityRegistry::new(),
                catalog: ActionCatalog::new(),
                store: AttestationStore::new(),
                coordinator: UpgradeCoordinator::new(
                    ResolverSet::new("genesis", config.resolver.clone()),
                    clock.now(),
                ),
                pending_projects: HashSet::new(),
            }),
            events: EventLog::new(),
            mirror,
            clock,
            environment: config.environment,
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn mirroring_available(&self) -> bool {
        self.mirror.is_available()
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, community: Option<CommunityId>, event: EngineEvent) -> EventRecord {
        debug!(event = event.name(), "Event emitted");
        self.events.emit(community, self.clock.now(), event)
    }

    // ------------------------------------------------------------------
    // Communities and roles
    // ------------------------------------------------------------------

    /// Register a community bound to the latest implementation, then try to
    /// establish its mirror project.
    pub async fn create_community(&self, spec: NewCommunity) -> Result<CommunityId, EngineError> {
        let now = self.clock.now();
        let (id, owner, implementation) = {
            let mut state = self.write();
            let implementation = state.coordinator.latest().version;
            let owner = spec.owner.clone();
            let id = state.registry.register(spec, implementation, now)?;
            (id, owner, implementation)
        };

        self.emit(
            Some(id),
            EngineEvent::CommunityCreated {
                owner,
                implementation,
            },
        );
        self.mirror_project_setup(id).await;
        Ok(id)
    }

    /// Create the mirror project for a community that has none yet, e.g.
    /// one created while the registry was unreachable.
    ///
    /// Returns `None` when mirroring is unavailable, the registry call
    /// failed, or another setup for the community is still in flight.
    pub async fn establish_mirror_project(
        &self,
        caller: &Identity,
        community: &CommunityId,
    ) -> Result<Option<MirrorProjectId>, EngineError> {
        {
            let state = self.read();
            let c = state
                .registry
                .community(community)
                .ok_or_else(|| EngineError::NotFound(community.to_string()))?;
            if !c.can_manage(caller) {
                return Err(EngineError::unauthorized(caller, "the owner or an approver"));
            }
            if !c.active {
                return Err(EngineError::InvalidReference(format!(
                    "{} is deactivated",
                    community
                )));
            }
            if let Some(existing) = &c.mirror_project_id {
                return Ok(Some(existing.clone()));
            }
        }
        Ok(self.mirror_project_setup(*community).await)
    }

    /// At most one setup per community is in flight; a concurrent caller
    /// gets `None` instead of creating a second external project.
    async fn mirror_project_setup(&self, community: CommunityId) -> Option<MirrorProjectId> {
        let request = {
            let mut state = self.write();
            let c = state.registry.community(&community)?;
            if let Some(existing) = &c.mirror_project_id {
                return Some(existing.clone());
            }
            let request = ProjectRequest {
                community,
                title: c.name.clone(),
                description: format!("Green Goods community {}", c.name),
                owner: c.owner.clone(),
            };
            if !state.pending_projects.insert(community) {
                debug!(community = %community, "Mirror project setup already in flight");
                return None;
            }
            request
        };

        let project = match self.mirror.create_project(&request).await {
            MirrorOutcome::Completed(project) => project,
            MirrorOutcome::Failed(e) => {
                self.write().pending_projects.remove(&community);
                self.emit(
                    Some(community),
                    EngineEvent::MirrorDispatchFailed {
                        operation: "create_project".into(),
                        source: None,
                        reason: e.to_string(),
                    },
                );
                return None;
            }
            MirrorOutcome::Skipped(reason) => {
                self.write().pending_projects.remove(&community);
                debug!(community = %community, ?reason, "Mirror project skipped");
                return None;
            }
        };

        // Approvers are read after the project is stored, so one added while
        // the registry call was in flight is still granted.
        let approvers = {
            let mut state = self.write();
            state.pending_projects.remove(&community);
            if let Err(e) = state
                .registry
                .set_mirror_project(&community, project.clone())
            {
                warn!(community = %community, project = %project, error = %e, "Mirror project discarded");
                return state.mirror_project(&community);
            }
            state
                .registry
                .community(&community)
                .map(|c| c.approvers.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };

        self.emit(
            Some(community),
            EngineEvent::MirrorProjectCreated {
                external_project_id: project.clone(),
            },
        );
        for approver in &approvers {
            self.dispatch_admin_grant(community, Some(&project), approver)
                .await;
        }
        Some(project)
    }

    pub fn add_member(
        &self,
        caller: &Identity,
        community: &CommunityId,
        member: impl Into<Identity>,
    ) -> Result<bool, EngineError> {
        Ok(self
            .write()
            .registry
            .add_member(caller, community, member.into())?)
    }

    /// Add an approver. A newly added approver is granted admin on the
    /// community's mirror project, best-effort.
    pub async fn add_approver(
        &self,
        caller: &Identity,
        community: &CommunityId,
        approver: impl Into<Identity>,
    ) -> Result<bool, EngineError> {
        let approver = approver.into();
        let (added, project) = {
            let mut state = self.write();
            let added = state
                .registry
                .add_approver(caller, community, approver.clone())?;
            (added, state.mirror_project(community))
        };

        if added {
            self.dispatch_admin_grant(*community, project.as_ref(), &approver)
                .await;
        }
        Ok(added)
    }

    pub fn remove_member(
        &self,
        caller: &Identity,
        community: &CommunityId,
        member: &Identity,
    ) -> Result<bool, EngineError> {
        Ok(self
            .write()
            .registry
            .remove_member(caller, community, member)?)
    }

    /// Mirror project admin rights are left in place.
    pub fn remove_approver(
        &self,
        caller: &Identity,
        community: &CommunityId,
        approver: &Identity,
    ) -> Result<bool, EngineError> {
        Ok(self
            .write()
            .registry
            .remove_approver(caller, community, approver)?)
    }

    pub fn deactivate_community(
        &self,
        caller: &Identity,
        community: &CommunityId,
    ) -> Result<(), EngineError> {
        Ok(self.write().registry.deactivate(caller, community)?)
    }

    // ------------------------------------------------------------------
    // Action catalog
    // ------------------------------------------------------------------

    pub fn register_action(
        &self,
        title: impl Into<String>,
        window: ActionWindow,
        capitals: Vec<Capital>,
    ) -> Result<ActionId, EngineError> {
        Ok(self.write().catalog.register(title, window, capitals)?)
    }

    pub fn action(&self, id: &ActionId) -> Option<ActionDefinition> {
        self.read().catalog.get(id).cloned()
    }

    pub fn actions(&self) -> Vec<ActionDefinition> {
        self.read().catalog.all().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Record a work submission. Submissions are never mirrored.
    pub fn submit_work(&self, claim: SubmissionClaim) -> Result<SubmissionId, EngineError> {
        let now = self.clock.now();
        let submission = {
            let mut state = self.write();
            let policy = state.policy_for(&claim.community);
            let resolved =
                resolvers::resolve(&SubmissionResolver, &claim, &state.view(&policy, now))?;
            state.store.append_submission(resolved.record.clone())?;
            resolved.record
        };

        info!(
            submission = %submission.id,
            community = %submission.community,
            submitter = %submission.submitter,
            action = %submission.action,
            "Submission recorded"
        );
        self.emit(
            Some(submission.community),
            EngineEvent::SubmissionCreated {
                submission: submission.id,
                submitter: submission.submitter.clone(),
                action: submission.action,
            },
        );
        Ok(submission.id)
    }

    /// Record a decision on a submission. A positive decision is mirrored
    /// after the record is committed.
    pub async fn approve_work(&self, claim: ApprovalClaim) -> Result<ApprovalId, EngineError> {
        let now = self.clock.now();
        let (approval, mirror, project) = {
            let mut state = self.write();
            let policy = state.policy_for(&claim.community);
            let resolved =
                resolvers::resolve(&ApprovalResolver, &claim, &state.view(&policy, now))?;
            state.store.append_approval(resolved.record.clone())?;
            let project = state.mirror_project(&claim.community);
            (resolved.record, resolved.mirror, project)
        };

        info!(
            approval = %approval.id,
            submission = %approval.submission,
            approver = %approval.approver,
            approved = approval.approved,
            "Approval recorded"
        );
        self.emit(
            Some(approval.community),
            EngineEvent::ApprovalCreated {
                approval: approval.id,
                submission: approval.submission,
                approver: approval.approver.clone(),
                approved: approval.approved,
            },
        );

        if let Some(payload) = mirror {
            self.dispatch_record(approval.community, project.as_ref(), &payload)
                .await;
        }
        Ok(approval.id)
    }

    /// Record an assessment; mirrored after commit.
    pub async fn submit_assessment(
        &self,
        claim: AssessmentClaim,
    ) -> Result<AssessmentId, EngineError> {
        let now = self.clock.now();
        let (assessment, mirror, project) = {
            let mut state = self.write();
            let policy = state.policy_for(&claim.community);
            let resolved =
                resolvers::resolve(&AssessmentResolver, &claim, &state.view(&policy, now))?;
            state.store.append_assessment(resolved.record.clone())?;
            let project = state.mirror_project(&claim.community);
            (resolved.record, resolved.mirror, project)
        };

        info!(
            assessment = %assessment.id,
            community = %assessment.community,
            author = %assessment.author,
            kind = %assessment.kind,
            "Assessment recorded"
        );
        self.emit(
            Some(assessment.community),
            EngineEvent::AssessmentCreated {
                assessment: assessment.id,
                author: assessment.author.clone(),
            },
        );

        if let Some(payload) = mirror {
            self.dispatch_record(assessment.community, project.as_ref(), &payload)
                .await;
        }
        Ok(assessment.id)
    }

    // ------------------------------------------------------------------
    // Mirror dispatch
    // ------------------------------------------------------------------

    async fn dispatch_record(
        &self,
        community: CommunityId,
        project: Option<&MirrorProjectId>,
        payload: &MirrorPayload,
    ) {
        match self.mirror.record(project, payload).await {
            MirrorOutcome::Completed(external_id) => {
                if let Some(project) = project {
                    self.emit(
                        Some(community),
                        EngineEvent::MirrorRecordCreated {
                            source: payload.source,
                            project: project.clone(),
                            external_id,
                        },
                    );
                }
            }
            MirrorOutcome::Failed(e) => {
                self.emit(
                    Some(community),
                    EngineEvent::MirrorDispatchFailed {
                        operation: "create_project_update".into(),
                        source: Some(payload.source),
                        reason: e.to_string(),
                    },
                );
            }
            MirrorOutcome::Skipped(_) => {}
        }
    }

    async fn dispatch_admin_grant(
        &self,
        community: CommunityId,
        project: Option<&MirrorProjectId>,
        admin: &Identity,
    ) {
        match self.mirror.grant_admin(project, admin).await {
            MirrorOutcome::Completed(AdminGrant::Granted) => {
                if let Some(project) = project {
                    self.emit(
                        Some(community),
                        EngineEvent::MirrorAdminGranted {
                            project: project.clone(),
                            admin: admin.clone(),
                        },
                    );
                }
            }
            MirrorOutcome::Completed(AdminGrant::AlreadyAdmin) | MirrorOutcome::Skipped(_) => {}
            MirrorOutcome::Failed(e) => {
                self.emit(
                    Some(community),
                    EngineEvent::MirrorDispatchFailed {
                        operation: "add_project_admin".into(),
                        source: None,
                        reason: e.to_string(),
                    },
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Upgrades
    // ------------------------------------------------------------------

    /// Publish a new implementation. Existing communities keep their binding.
    pub fn upgrade_resolver(
        &self,
        resolver_set: ResolverSet,
        layout: FieldLayout,
    ) -> Result<u32, EngineError> {
        let label = resolver_set.label.clone();
        let version = self
            .write()
            .coordinator
            .publish(resolver_set, layout, self.clock.now())?;
        self.emit(None, EngineEvent::ResolverSetPublished { version, label });
        Ok(version)
    }

    /// Rebind a community to another implementation. Owner only; stored
    /// records are untouched.
    pub fn migrate_community(
        &self,
        caller: &Identity,
        community: &CommunityId,
        target: u32,
    ) -> Result<MigrationRecord, EngineError> {
        let now = self.clock.now();
        let record = {
            let mut state = self.write();
            let c = state
                .registry
                .community(community)
                .ok_or_else(|| EngineError::NotFound(community.to_string()))?;
            let record = state.coordinator.plan_migration(c, caller, target, now)?;
            state.registry.rebind(community, target)?;
            state.coordinator.record_migration(record.clone());
            record
        };

        self.emit(
            Some(*community),
            EngineEvent::CommunityMigrated {
                from: record.from,
                to: record.to,
                by: record.by.clone(),
            },
        );
        Ok(record)
    }

    pub fn implementation(&self, version: u32) -> Option<Implementation> {
        self.read().coordinator.implementation(version).cloned()
    }

    pub fn latest_implementation(&self) -> Implementation {
        self.read().coordinator.latest().clone()
    }

    pub fn migration_history(&self, community: &CommunityId) -> Vec<MigrationRecord> {
        self.read().coordinator.history(community).to_vec()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn community(&self, id: &CommunityId) -> Option<Community> {
        self.read().registry.community(id).cloned()
    }

    pub fn communities(&self) -> Vec<Community> {
        self.read()
            .registry
            .communities()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_member(&self, community: &CommunityId, identity: &Identity) -> bool {
        self.read().registry.is_member(community, identity)
    }

    pub fn is_approver(&self, community: &CommunityId, identity: &Identity) -> bool {
        self.read().registry.is_approver(community, identity)
    }

    pub fn submission(&self, id: &SubmissionId) -> Option<Submission> {
        self.read().store.submission(id).cloned()
    }

    pub fn approval(&self, id: &ApprovalId) -> Option<Approval> {
        self.read().store.approval(id).cloned()
    }

    pub fn assessment(&self, id: &AssessmentId) -> Option<Assessment> {
        self.read().store.assessment(id).cloned()
    }

    /// The latest decision on a submission.
    pub fn canonical_approval(&self, submission: &SubmissionId) -> Option<Approval> {
        self.read().store.canonical_approval(submission).cloned()
    }

    pub fn approvals_for(&self, submission: &SubmissionId) -> Vec<Approval> {
        self.read()
            .store
            .approvals_for(submission)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn submissions(&self, filter: &RecordFilter) -> Vec<Submission> {
        self.read()
            .store
            .submissions(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn submissions_for(&self, community: &CommunityId) -> Vec<Submission> {
        self.submissions(&RecordFilter::new().with_community(*community))
    }

    pub fn assessments(&self, filter: &RecordFilter) -> Vec<Assessment> {
        self.read()
            .store
            .assessments(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn assessments_for(&self, community: &CommunityId) -> Vec<Assessment> {
        self.assessments(&RecordFilter::new().with_community(*community))
    }

    pub fn records_for(&self, community: &CommunityId) -> Vec<RecordRef> {
        self.read().store.records_for(community)
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.all()
    }

    pub fn events_for(&self, community: &CommunityId) -> Vec<EventRecord> {
        self.events.for_community(community)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.events.subscribe()
    }
}
