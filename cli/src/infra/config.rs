//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::BunkrConfig;

/// Reads `~/.bunkr/config.yaml`, or the file named by `BUNKR_CONFIG`.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<BunkrConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(BunkrConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(BunkrConfig::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(val) = std::env::var_os("BUNKR_CONFIG") {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".bunkr").join("config.yaml"))
    }
}
