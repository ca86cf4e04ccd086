use std::time::Duration;

use thiserror::Error;

/// Errors raised by the external registry or the environment table.
///
/// The adapter never returns these to its callers; it folds them into
/// `MirrorOutcome::Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("external registry rejected call: {0}")]
    Registry(String),

    #[error("external registry unreachable: {0}")]
    Transport(String),

    #[error("external registry call timed out after {0:?}")]
    Timeout(Duration),

    #[error("external registry call panicked during {0}")]
    Panicked(String),

    #[error("invalid environment entry '{environment}': {reason}")]
    InvalidEnvironment { environment: String, reason: String },
}
