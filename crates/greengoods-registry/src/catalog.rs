use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use greengoods_types::{ActionId, Capital};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RegistryError;

/// When an action accepts submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionWindow {
    AlwaysOpen,
    /// Inclusive on both ends.
    Between {
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
}

impl ActionWindow {
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        match self {
            ActionWindow::AlwaysOpen => true,
            ActionWindow::Between { starts_at, ends_at } => *starts_at <= at && at <= *ends_at,
        }
    }
}

/// A claimable unit of work. Immutable once registered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub title: String,
    pub window: ActionWindow,
    #[serde(default)]
    pub capitals: Vec<Capital>,
}

/// Action Catalog: the set of permissible claim types.
pub struct ActionCatalog {
    actions: BTreeMap<ActionId, ActionDefinition>,
    next_id: u64,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register an action and return its assigned id.
    pub fn register(
        &mut self,
        title: impl Into<String>,
        window: ActionWindow,
        capitals: Vec<Capital>,
    ) -> Result<ActionId, RegistryError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(RegistryError::InvalidAction("title is required".into()));
        }
        if let ActionWindow::Between { starts_at, ends_at } = window {
            if ends_at < starts_at {
                return Err(RegistryError::InvalidAction(format!(
                    "window ends ({}) before it starts ({})",
                    ends_at, starts_at
                )));
            }
        }

        let id = ActionId(self.next_id);
        self.next_id += 1;

        info!(action = %id, title = %title, "Action registered");

        self.actions.insert(
            id,
            ActionDefinition {
                id,
                title,
                window,
                capitals,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: &ActionId) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    /// Whether the action exists and accepts submissions at `at`.
    pub fn is_open(&self, id: &ActionId, at: DateTime<Utc>) -> Result<bool, RegistryError> {
        self.actions
            .get(id)
            .map(|a| a.window.is_open(at))
            .ok_or(RegistryError::ActionNotFound(*id))
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
    }
}
