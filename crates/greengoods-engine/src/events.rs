use std::sync::Mutex;

use chrono::{DateTime, Utc};
use greengoods_types::{
    ActionId, ApprovalId, AssessmentId, CommunityId, EventId, Identity, MirrorProjectId,
    MirrorRecordId, RecordRef, SubmissionId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted for external indexers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    CommunityCreated {
        owner: Identity,
        implementation: u32,
    },
    SubmissionCreated {
        submission: SubmissionId,
        submitter: Identity,
        action: ActionId,
    },
    ApprovalCreated {
        approval: ApprovalId,
        submission: SubmissionId,
        approver: Identity,
        approved: bool,
    },
    AssessmentCreated {
        assessment: AssessmentId,
        author: Identity,
    },
    MirrorProjectCreated {
        external_project_id: MirrorProjectId,
    },
    MirrorRecordCreated {
        source: RecordRef,
        project: MirrorProjectId,
        external_id: MirrorRecordId,
    },
    MirrorAdminGranted {
        project: MirrorProjectId,
        admin: Identity,
    },
    /// Observability only; the primary operation already succeeded.
    MirrorDispatchFailed {
        operation: String,
        source: Option<RecordRef>,
        reason: String,
    },
    ResolverSetPublished {
        version: u32,
        label: String,
    },
    CommunityMigrated {
        from: u32,
        to: u32,
        by: Identity,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::CommunityCreated { .. } => "CommunityCreated",
            EngineEvent::SubmissionCreated { .. } => "SubmissionCreated",
            EngineEvent::ApprovalCreated { .. } => "ApprovalCreated",
            EngineEvent::AssessmentCreated { .. } => "AssessmentCreated",
            EngineEvent::MirrorProjectCreated { .. } => "MirrorProjectCreated",
            EngineEvent::MirrorRecordCreated { .. } => "MirrorRecordCreated",
            EngineEvent::MirrorAdminGranted { .. } => "MirrorAdminGranted",
            EngineEvent::MirrorDispatchFailed { .. } => "MirrorDispatchFailed",
            EngineEvent::ResolverSetPublished { .. } => "ResolverSetPublished",
            EngineEvent::CommunityMigrated { .. } => "CommunityMigrated",
        }
    }
}

/// An emitted event with its envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    /// Position in the log, starting at 0.
    pub sequence: u64,
    pub community: Option<CommunityId>,
    pub emitted_at: DateTime<Utc>,
    pub event: EngineEvent,
}

/// Append-only event log with live fan-out.
///
/// Subscribers that lag behind lose events from the channel but can always
/// re-read the log.
pub struct EventLog {
    records: Mutex<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl EventLog {
    pub const CHANNEL_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(Self::CHANNEL_CAPACITY);
        Self {
            records: Mutex::new(Vec::new()),
            sender,
        }
    }

    pub fn emit(
        &self,
        community: Option<CommunityId>,
        emitted_at: DateTime<Utc>,
        event: EngineEvent,
    ) -> EventRecord {
        let record = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let record = EventRecord {
                id: EventId::new(),
                sequence: records.len() as u64,
                community,
                emitted_at,
                event,
            };
            records.push(record.clone());
            record
        };
        // No receivers is fine.
        let _ = self.sender.send(record.clone());
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub fn all(&self) -> Vec<EventRecord> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn for_community(&self, community: &CommunityId) -> Vec<EventRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.community.as_ref() == Some(community))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
