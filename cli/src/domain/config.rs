//! User configuration stored in `~/.bunkr/config.yaml`.
//!
//! Pure types only. Reading the file is `infra::config::YamlConfigStore`.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::hardening::HardeningConfig;

/// Where recipes are published.
pub const DEFAULT_RECIPES_URL: &str =
    "https://raw.githubusercontent.com/pankajbeniwal/bunkr/main/recipes";

#[allow(clippy::expect_used)] // compile-time constant pattern
static POSIX_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid user name pattern"));

/// Top-level configuration. Every key is optional; flags and environment
/// variables take precedence over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BunkrConfig {
    /// Base URL for `<name>.yaml` and `index.yaml`.
    pub recipes_url: Option<String>,
    /// SSH port configured during hardening.
    pub ssh_port: Option<u16>,
    /// Administrative user created during hardening.
    pub admin_user: Option<String>,
}

impl BunkrConfig {
    /// Resolve the recipe base URL: explicit value, then file, then default.
    ///
    /// Trailing slashes are removed.
    #[must_use]
    pub fn recipes_url(&self, explicit: Option<&str>) -> String {
        explicit
            .filter(|u| !u.trim().is_empty())
            .or(self.recipes_url.as_deref())
            .unwrap_or(DEFAULT_RECIPES_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Hardening inputs: explicit SSH port, then file, then defaults.
    ///
    /// The admin user ends up in shell commands, a sudoers path and
    /// `AllowUsers`, so it must be a plain POSIX user name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAdminUser`] for any other name.
    pub fn hardening(&self, ssh_port: Option<u16>) -> Result<HardeningConfig, ConfigError> {
        let defaults = HardeningConfig::default();
        let admin_user = match self.admin_user.as_deref().map(str::trim) {
            Some(user) if !user.is_empty() => {
                if !POSIX_USER.is_match(user) {
                    return Err(ConfigError::InvalidAdminUser(user.to_string()));
                }
                user.to_string()
            }
            _ => defaults.admin_user,
        };
        Ok(HardeningConfig {
            ssh_port: ssh_port.or(self.ssh_port).unwrap_or(defaults.ssh_port),
            admin_user,
        })
    }
}
