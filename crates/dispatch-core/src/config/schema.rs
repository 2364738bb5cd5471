//! Configuration schema for dispatch
//!
//! The document lists the deployable programs, the destination hosts every
//! program is synchronized to, ignore patterns shared by all programs, and
//! where the per-day command logs are written.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DispatchConfig {
    /// Deployable programs, in the order `all` expands to
    #[serde(default)]
    pub programs: Vec<ProgramConfig>,

    /// Exclude patterns applied to every program's sync
    #[serde(default)]
    pub ignore_files: Vec<String>,

    /// Destination hosts
    #[serde(default)]
    pub dest_hosts: Vec<DestHost>,

    /// Base directory for command logs (empty disables them)
    #[serde(default)]
    pub save_path: PathBuf,

    /// Upper bound on simultaneous external commands (unset or 0: unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

/// A version-controlled source tree that gets deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(rename = "program_name")]
    pub name: String,

    /// Subversion working copy
    #[serde(rename = "program_path")]
    pub path: PathBuf,

    /// Path on the destination hosts
    pub dest_path: String,

    /// Shell commands run in `path` after every update, in order
    #[serde(default)]
    pub scripts: Vec<String>,

    /// Exclude patterns specific to this program
    #[serde(default)]
    pub ignore_files: Vec<String>,

    /// Toolchain binary; its presence makes the program buildable
    #[serde(rename = "go_exec_path", default, skip_serializing_if = "Option::is_none")]
    pub build_exec_path: Option<String>,

    /// Appended to `path` to locate build targets
    #[serde(default)]
    pub build_source_prefix: String,
}

impl ProgramConfig {
    /// Toolchain to build with, if the program is buildable.
    pub fn build_exec(&self) -> Option<&str> {
        self.build_exec_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A remote machine programs are synchronized to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestHost {
    pub alias: String,
    pub username: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub key_file: PathBuf,
}

fn default_port() -> u16 {
    22
}

impl DestHost {
    /// `user@host`, as shown in progress output.
    pub fn target(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut names = HashSet::new();
        for program in &self.programs {
            if program.name.trim().is_empty() {
                anyhow::bail!("Program with path '{}' has no program_name", program.path.display());
            }
            if program.name == "all" {
                anyhow::bail!("'all' is reserved and cannot be used as a program_name");
            }
            if !names.insert(program.name.as_str()) {
                anyhow::bail!("Duplicate program_name '{}'", program.name);
            }
            if program.path.as_os_str().is_empty() {
                anyhow::bail!("Program '{}' has an empty program_path", program.name);
            }
        }

        let mut aliases = HashSet::new();
        for host in &self.dest_hosts {
            if host.alias.trim().is_empty() {
                anyhow::bail!("Destination host '{}' has no alias", host.host);
            }
            if !aliases.insert(host.alias.as_str()) {
                anyhow::bail!("Duplicate destination host alias '{}'", host.alias);
            }
        }

        if self.max_parallel == Some(0) {
            tracing::debug!("max_parallel = 0, running without a concurrency limit");
        }

        Ok(())
    }

    pub fn program(&self, name: &str) -> Option<&ProgramConfig> {
        self.programs.iter().find(|p| p.name == name)
    }

    pub fn program_names(&self) -> Vec<String> {
        self.programs.iter().map(|p| p.name.clone()).collect()
    }

    pub fn host(&self, alias: &str) -> Option<&DestHost> {
        self.dest_hosts.iter().find(|h| h.alias == alias)
    }

    pub fn aliases(&self) -> Vec<String> {
        self.dest_hosts.iter().map(|h| h.alias.clone()).collect()
    }

    /// Global ignore patterns followed by the program's own.
    pub fn excludes_for<'a>(&'a self, program: &'a ProgramConfig) -> impl Iterator<Item = &'a String> {
        self.ignore_files.iter().chain(program.ignore_files.iter())
    }

    pub fn log_dir(&self) -> &Path {
        &self.save_path
    }

    /// Concurrency limit for external commands, `None` when unbounded.
    pub fn parallelism(&self) -> Option<usize> {
        self.max_parallel.filter(|n| *n > 0)
    }
}
