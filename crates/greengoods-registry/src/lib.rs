//! # greengoods-registry
//!
//! Leaf lookups consumed by the attestation resolvers.
//!
//! - **CapabilityRegistry**: per-community role sets (members, approvers),
//!   owner/approver-gated mutation, the community's mirror project id and its
//!   bound implementation version
//! - **ActionCatalog**: the claimable actions and their validity windows
//!
//! Both are pure in-memory state; the engine owns them behind its own locks.

pub mod catalog;
pub mod community;
pub mod error;
pub mod registry;

pub use catalog::{ActionCatalog, ActionDefinition, ActionWindow};
pub use community::{Community, Role};
pub use error::RegistryError;
pub use registry::{CapabilityRegistry, NewCommunity};
