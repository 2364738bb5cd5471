//! Config store for locating and loading the dispatch config file.

use std::path::{Path, PathBuf};

use super::{DispatchConfig, parser};

/// File name looked up in the working directory and the user config dir.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Locate the config file: an explicit path wins, then `./config.json`,
    /// then `<config dir>/dispatch/config.json`.
    pub fn locate(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::from_path(path));
        }

        let local = std::env::current_dir()?.join(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Ok(Self::from_path(local));
        }

        let global = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("dispatch")
            .join(DEFAULT_CONFIG_FILE);
        if global.exists() {
            return Ok(Self::from_path(global));
        }

        anyhow::bail!(
            "No config file found. Looked for {} and {}; pass one with -c",
            local.display(),
            global.display()
        )
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<DispatchConfig> {
        parser::parse_config(&self.config_path)
    }
}
