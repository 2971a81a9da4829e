//! Recipe manifests: the declarative description of one self-hosted app.
//!
//! Pure functions only. Fetching lives behind `application::ports::RecipeSource`.

pub mod compose;
pub mod env;
pub mod prompt;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::{RecipeError, ValidationError};

pub use compose::{generate_compose, service_environment};
pub use env::{
    carry_generated, expand_auto_generate, expand_template, generate_env, is_auto_generate,
    parse_env,
};
pub use prompt::{Answers, parse_presets, resolve_prompts};

const DEFAULT_HEALTH_TIMEOUT: u64 = 30;
const DEFAULT_HEALTH_INTERVAL: u64 = 2;

/// A parsed recipe manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub description: String,
    pub image: String,
    /// Private recipes are served on the mesh network, public ones through Caddy.
    pub private: bool,
    pub prompts: Vec<Prompt>,
    /// Container ports; the first one is published on the host.
    pub ports: Vec<u16>,
    pub volumes: Vec<String>,
    pub services: Vec<AuxService>,
    pub environment: BTreeMap<String, String>,
    pub health_check: Option<HealthCheck>,
    /// Run once in the primary container before the first start.
    pub init_command: Option<String>,
    /// Shell lines run as one script in the primary container before the first start.
    pub post_init: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompt {
    pub key: String,
    pub label: String,
    pub required: bool,
    pub default: String,
    pub secret: bool,
}

/// A sidecar service (database, cache) started next to the primary one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxService {
    pub name: String,
    pub image: String,
    pub environment: BTreeMap<String, String>,
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub url: String,
    /// Seconds.
    #[serde(default = "default_health_timeout")]
    pub timeout: u64,
    /// Seconds.
    #[serde(default = "default_health_interval")]
    pub interval: u64,
}

impl HealthCheck {
    /// Probe URL with `localhost:<container_port>` moved to the host port.
    #[must_use]
    pub fn url_for(&self, container_port: u16, host_port: u16) -> String {
        if container_port == host_port {
            return self.url.clone();
        }
        self.url.replace(
            &format!("localhost:{container_port}"),
            &format!("localhost:{host_port}"),
        )
    }

    /// Number of probes that fit in the timeout, at least one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        u32::try_from(self.timeout / self.interval.max(1))
            .unwrap_or(u32::MAX)
            .max(1)
    }
}

fn default_health_timeout() -> u64 {
    DEFAULT_HEALTH_TIMEOUT
}

fn default_health_interval() -> u64 {
    DEFAULT_HEALTH_INTERVAL
}

/// One line of the published recipe index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexEntry {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Recipe {
    /// Parse a manifest. `name` is only used for error messages.
    ///
    /// Zero health-check timings are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Parse`] on malformed YAML.
    pub fn parse(name: &str, data: &[u8]) -> Result<Self, RecipeError> {
        let mut recipe: Recipe = serde_yaml::from_slice(data).map_err(|e| RecipeError::Parse {
            name: name.to_string(),
            detail: e.to_string(),
        })?;
        if let Some(hc) = recipe.health_check.as_mut() {
            if hc.timeout == 0 {
                hc.timeout = DEFAULT_HEALTH_TIMEOUT;
            }
            if hc.interval == 0 {
                hc.interval = DEFAULT_HEALTH_INTERVAL;
            }
        }
        Ok(recipe)
    }

    /// Check that the manifest can be deployed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name, version or image, or
    /// when no port is exposed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.version.trim().is_empty() {
            return Err(ValidationError::MissingField("version"));
        }
        if self.image.trim().is_empty() {
            return Err(ValidationError::MissingField("image"));
        }
        if self.ports.is_empty() {
            return Err(ValidationError::NoPorts);
        }
        Ok(())
    }

    /// Parse and validate in one go.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Parse`] or [`RecipeError::Validation`].
    pub fn load(name: &str, data: &[u8]) -> Result<Self, RecipeError> {
        let recipe = Self::parse(name, data)?;
        recipe.validate().map_err(|source| RecipeError::Validation {
            name: name.to_string(),
            source,
        })?;
        Ok(recipe)
    }

    /// The container port published on the host.
    ///
    /// Only meaningful after [`Recipe::validate`] succeeded.
    #[must_use]
    pub fn primary_port(&self) -> u16 {
        self.ports.first().copied().unwrap_or_default()
    }
}

/// Parse the recipe index document.
///
/// # Errors
///
/// Returns [`RecipeError::Parse`] on malformed YAML.
pub fn parse_index(data: &[u8]) -> Result<Vec<IndexEntry>, RecipeError> {
    serde_yaml::from_slice(data).map_err(|e| RecipeError::Parse {
        name: "index".to_string(),
        detail: e.to_string(),
    })
}
