//! The per-target state document.
//!
//! Pure data plus the port allocator. Loading and saving go through the
//! transport, see `application::services::state_store`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::StateError;

/// Location of the state document on the target.
pub const STATE_PATH: &str = "/etc/bunkr/state.json";

/// Everything bunkr has done to one target machine.
///
/// Every field defaults when missing so partial or older documents load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct State {
    pub hardening: HardeningState,
    /// Mesh network (Tailscale) status.
    #[serde(rename = "tailscale")]
    pub mesh: MeshState,
    pub recipes: BTreeMap<String, RecipeState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningState {
    /// True only once every hardening step completed in one run.
    pub applied: bool,
    pub steps: BTreeMap<String, bool>,
    pub applied_at: Option<DateTime<Utc>>,
    pub ssh_port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshState {
    pub installed: bool,
    pub connected: bool,
    /// `MagicDNS` name of the target, without the trailing dot.
    pub hostname: String,
}

/// One installed recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeState {
    pub version: String,
    pub domain: String,
    pub private: bool,
    pub installed_at: Option<DateTime<Utc>>,
    /// Host port bound on 127.0.0.1.
    pub port: u16,
    pub container_port: u16,
}

impl State {
    /// Whether the hardening step `name` is recorded as complete.
    #[must_use]
    pub fn step_done(&self, name: &str) -> bool {
        self.hardening.steps.get(name).copied().unwrap_or(false)
    }

    pub fn mark_step_done(&mut self, name: &str) {
        self.hardening.steps.insert(name.to_string(), true);
    }

    /// Host ports currently held by installed recipes.
    #[must_use]
    pub fn used_ports(&self) -> BTreeSet<u16> {
        self.recipes.values().map(|r| r.port).collect()
    }

    /// Smallest port at or above `desired` not held by any recipe.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NoFreePort`] when every port from `desired`
    /// through 65535 is taken.
    pub fn allocate_port(&self, desired: u16) -> Result<u16, StateError> {
        let used = self.used_ports();
        (desired..=u16::MAX)
            .find(|p| !used.contains(p))
            .ok_or(StateError::NoFreePort(desired))
    }

    /// Look up an installed recipe.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::NotInstalled`] if `name` has no entry.
    pub fn recipe(&self, name: &str) -> Result<&RecipeState, StateError> {
        self.recipes
            .get(name)
            .ok_or_else(|| StateError::NotInstalled(name.to_string()))
    }
}
