//! Attestation engine: resolvers, append-only store and upgrade coordinator.
//!
//! Every state-changing claim passes the same pipeline before it is recorded:
//!
//! 1. **Identity**: the claimant holds the required role in the community
//!    (member for submissions, approver for approvals and assessments)
//! 2. **Reference**: the community is active and every referenced record or
//!    action exists, is open and belongs to the same community
//! 3. **Content**: required fields, known enumerations, JSON-object metadata
//!
//! The first failing check rejects the claim. An accepted claim is appended
//! to the [`AttestationStore`] and announced as an event; approved work and
//! assessments are then mirrored into the external registry through the
//! [`ProjectMirrorAdapter`](greengoods_mirror::ProjectMirrorAdapter). Mirror
//! outcomes only ever produce events.
//!
//! ## Invariants
//!
//! - The store is append-only. Records are never modified or deleted.
//! - A community stays bound to the implementation it was created with until
//!   its owner migrates it. Publishing a new implementation forces nothing.
//! - A migration only appends fields to the community layout.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod resolvers;
pub mod store;
pub mod upgrade;

pub use config::{EngineConfig, MirrorConfig};
pub use context::{Check, CheckResult, ClaimKind, ResolutionContext};
pub use engine::AttestationEngine;
pub use error::{EngineError, StoreError};
pub use events::{EngineEvent, EventLog, EventRecord};
pub use resolvers::{
    ApprovalResolver, AssessmentResolver, ClaimResolver, Resolved, ResolverView,
    SubmissionResolver,
};
pub use store::{AttestationStore, RecordFilter};
pub use upgrade::{
    FieldLayout, Implementation, MigrationRecord, ResolverPolicy, ResolverSet, UpgradeCoordinator,
};
