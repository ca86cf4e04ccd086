//! Engine configuration

use std::time::Duration;

use greengoods_mirror::{EnvironmentEntry, EnvironmentTable};
use serde::{Deserialize, Serialize};

use crate::upgrade::ResolverPolicy;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Deployment environment this engine runs in; looked up in `environments`
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Mirroring configuration per environment
    #[serde(default)]
    pub environments: EnvironmentTable,

    /// Policy of the genesis resolver set
    #[serde(default)]
    pub resolver: ResolverPolicy,

    /// Mirror dispatch settings
    #[serde(default)]
    pub mirror: MirrorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            environments: EnvironmentTable::default(),
            resolver: ResolverPolicy::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

/// Mirror dispatch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Upper bound on a single external registry call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MirrorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_environment() -> String {
    "localhost".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl EngineConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `GREENGOODS_*` variables (`__` separates nested keys, e.g.
    /// `GREENGOODS_MIRROR__TIMEOUT_SECS`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GREENGOODS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// The selected environment's entry, if it has mirroring.
    pub fn resolved_environment(&self) -> Option<EnvironmentEntry> {
        self.environments.resolve(&self.environment)
    }

    /// Local development: no mirroring anywhere.
    pub fn development() -> Self {
        Self {
            environments: EnvironmentTable::new()
                .with("localhost", EnvironmentEntry::unavailable().with_chain_id(31337)),
            ..Default::default()
        }
    }
}
