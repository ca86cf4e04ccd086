//! Project Mirror: best-effort bridge into the external accountability registry.
//!
//! Approved work and assessments are mirrored as "project updates" under the
//! community's mirror project. Mirroring is strictly secondary:
//!
//! - When the deployment environment has no mirroring entry, or the community
//!   has no mirror project yet, every call is a silent skip.
//! - Registry errors, timeouts and panics are caught at the adapter boundary
//!   and reported as a `Failed` outcome. They never reach the caller as `Err`.
//!
//! The adapter holds no copy of what it created; the returned external ids are
//! surfaced as events for indexers.

pub mod adapter;
pub mod environment;
pub mod error;
pub mod mocks;
pub mod payload;
pub mod traits;

pub use adapter::{AdminGrant, MirrorOutcome, ProjectMirrorAdapter, SkipReason};
pub use environment::{EnvironmentEntry, EnvironmentTable};
pub use error::MirrorError;
pub use mocks::{MockExternalRegistry, MockMode, RegistryCall};
pub use payload::{MirrorPayload, ProjectRequest};
pub use traits::ExternalRegistry;
