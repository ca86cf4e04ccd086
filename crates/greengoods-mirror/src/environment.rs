use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// Mirroring configuration for one deployment environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    /// Chain id of the environment, informational.
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub mirroring_available: bool,
    #[serde(default)]
    pub registry_address: String,
    #[serde(default)]
    pub admin_resolver_address: String,
    #[serde(default)]
    pub project_schema_id: String,
    #[serde(default)]
    pub update_schema_id: String,
}

impl EnvironmentEntry {
    /// An environment that explicitly has no mirroring.
    pub fn unavailable() -> Self {
        Self {
            chain_id: None,
            mirroring_available: false,
            registry_address: String::new(),
            admin_resolver_address: String::new(),
            project_schema_id: String::new(),
            update_schema_id: String::new(),
        }
    }

    pub fn available(
        registry_address: impl Into<String>,
        admin_resolver_address: impl Into<String>,
        project_schema_id: impl Into<String>,
        update_schema_id: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: None,
            mirroring_available: true,
            registry_address: registry_address.into(),
            admin_resolver_address: admin_resolver_address.into(),
            project_schema_id: project_schema_id.into(),
            update_schema_id: update_schema_id.into(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    fn validate(&self, environment: &str) -> Result<(), MirrorError> {
        if !self.mirroring_available {
            return Ok(());
        }
        let required = [
            ("registry_address", &self.registry_address),
            ("admin_resolver_address", &self.admin_resolver_address),
            ("project_schema_id", &self.project_schema_id),
            ("update_schema_id", &self.update_schema_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(MirrorError::InvalidEnvironment {
                    environment: environment.to_string(),
                    reason: format!("{} is required when mirroring is available", field),
                });
            }
        }
        Ok(())
    }
}

/// Static table of environment id → mirroring configuration.
///
/// A missing entry means mirroring is unavailable. The engine is handed one
/// resolved entry at startup; nothing branches on a global chain id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentTable {
    entries: BTreeMap<String, EnvironmentEntry>,
}

impl EnvironmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, environment: impl Into<String>, entry: EnvironmentEntry) -> Self {
        self.entries.insert(environment.into(), entry);
        self
    }

    pub fn lookup(&self, environment: &str) -> Option<&EnvironmentEntry> {
        self.entries.get(environment)
    }

    pub fn mirroring_available(&self, environment: &str) -> bool {
        self.lookup(environment)
            .map(|e| e.mirroring_available)
            .unwrap_or(false)
    }

    /// The entry to inject into the adapter: `None` unless mirroring is on.
    pub fn resolve(&self, environment: &str) -> Option<EnvironmentEntry> {
        self.lookup(environment)
            .filter(|e| e.mirroring_available)
            .cloned()
    }

    pub fn environments(&self) -> impl Iterator<Item = (&str, &EnvironmentEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry that claims mirroring must name its registry and schemas.
    pub fn validate(&self) -> Result<(), MirrorError> {
        self.entries
            .iter()
            .try_for_each(|(name, entry)| entry.validate(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EnvironmentTable {
        EnvironmentTable::new()
            .with("localhost", EnvironmentEntry::unavailable().with_chain_id(31337))
            .with(
                "sepolia",
                EnvironmentEntry::available("0xregistry", "0xresolver", "0xproject", "0xupdate")
                    .with_chain_id(11155111),
            )
    }

    #[test]
    fn missing_entry_is_unavailable() {
        let t = table();
        assert!(!t.mirroring_available("mainnet"));
        assert!(t.resolve("mainnet").is_none());
    }

    #[test]
    fn explicit_unavailable_entry() {
        let t = table();
        assert!(t.lookup("localhost").is_some());
        assert!(t.resolve("localhost").is_none());
    }

    #[test]
    fn available_entry_resolves() {
        let entry = table().resolve("sepolia").unwrap();
        assert_eq!(entry.registry_address, "0xregistry");
        assert_eq!(entry.chain_id, Some(11155111));
    }

    #[test]
    fn validation_requires_addresses_when_available() {
        let mut entry = EnvironmentEntry::available("0xregistry", "", "0xp", "0xu");
        entry.chain_id = Some(1);
        let t = EnvironmentTable::new().with("broken", entry);
        let err = t.validate().unwrap_err();
        assert!(matches!(err, MirrorError::InvalidEnvironment { .. }));
        assert!(table().validate().is_ok());
    }

    #[test]
    fn deserializes_from_map() {
        let json = serde_json::json!({
            "celo": {
                "chain_id": 42220,
                "mirroring_available": true,
                "registry_address": "0xr",
                "admin_resolver_address": "0xa",
                "project_schema_id": "0xp",
                "update_schema_id": "0xu"
            }
        });
        let t: EnvironmentTable = serde_json::from_value(json).unwrap();
        assert!(t.mirroring_available("celo"));
    }
}
