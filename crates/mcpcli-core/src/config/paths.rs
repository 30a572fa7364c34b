//! Config path resolution helpers.

use std::path::{Path, PathBuf};

use anyhow::Context;

/// Environment variable that overrides the configuration root.
pub const ROOT_ENV_VAR: &str = "MCP_CLI_ROOT";

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const SETTINGS_FILE: &str = "settings.toml";
const LEGACY_DIR: &str = ".mcp-cli";

/// Root directory holding the configuration and settings files.
///
/// Resolved once by the hosting surface at start-up and passed down
/// explicitly; library code never re-derives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRoot {
    path: PathBuf,
}

impl ConfigRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the root: explicit path, then `MCP_CLI_ROOT`, then the
    /// platform config directory.
    pub fn resolve(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::new(path));
        }
        if let Some(path) = std::env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(path)));
        }
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .context("Could not determine config directory")?;
        Ok(Self::new(base.join("mcp-cli")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_dir(&self) -> PathBuf {
        self.path.join(CONFIG_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.path.join(SETTINGS_FILE)
    }
}

pub fn legacy_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(LEGACY_DIR).join(CONFIG_FILE)
}

/// Concrete file locations used by a `ConfigStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub legacy_file: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn new(config_file: PathBuf, legacy_file: Option<PathBuf>) -> Self {
        Self {
            config_file,
            legacy_file,
        }
    }

    pub fn for_root(root: &ConfigRoot, home_dir: Option<&Path>) -> Self {
        Self::new(root.config_file(), home_dir.map(legacy_config_path))
    }
}
