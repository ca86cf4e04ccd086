//! Core type definitions for the Green Goods attestation engine.
//!
//! No business logic, just the identifiers, records and inbound claims shared by
//! the registry, mirror and engine crates.
//!
//! ## Records
//!
//! - **Submission**: a member's claim of having performed a unit of work
//! - **Approval**: an approver's decision on a Submission
//! - **Assessment**: an approver-authored periodic evaluation of a community
//!
//! Records are immutable once created. Claims are the unvalidated inbound shape
//! of a record; the engine's resolvers turn an accepted claim into a record.

pub mod capital;
pub mod claims;
pub mod clock;
pub mod identity;
pub mod ids;
pub mod records;

pub use capital::{AssessmentKind, Capital, UnknownVariant};
pub use claims::{ApprovalClaim, AssessmentClaim, SubmissionClaim};
pub use clock::{Clock, FixedClock, SystemClock};
pub use identity::Identity;
pub use ids::{
    ActionId, ApprovalId, AssessmentId, CommunityId, EventId, MirrorProjectId, MirrorRecordId,
    SubmissionId,
};
pub use records::{Approval, Assessment, RecordRef, ReportingPeriod, Submission};
