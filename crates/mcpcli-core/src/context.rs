//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use crate::agent::AgentRuntime;
use crate::bridge::{ExecutionBridge, TaskSupervisor};
use crate::config::{ConfigPaths, ConfigRoot, ConfigStore};
use crate::error::Result;
use crate::registry::ServerRegistry;
use crate::settings::Settings;
use crate::tool_report::ToolReportParser;

/// Shared paths and settings.
///
/// Surfaces (CLI/GUI/HTTP) create this once and derive their services from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    root: ConfigRoot,
    home_dir: Option<PathBuf>,
    settings: Settings,
}

impl AppContext {
    /// Create a context, loading `<root>/settings.toml` if present.
    pub fn new(root: ConfigRoot, home_dir: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load(&root.settings_file())?;
        Ok(Self::with_settings(root, home_dir, settings))
    }

    pub fn with_settings(root: ConfigRoot, home_dir: Option<PathBuf>, settings: Settings) -> Self {
        Self {
            root,
            home_dir,
            settings,
        }
    }

    /// Resolve the root from `explicit`, the environment or the platform
    /// default, and use the real home directory for legacy migration.
    pub fn from_env(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = ConfigRoot::resolve(explicit)?;
        Ok(Self::new(root, dirs::home_dir())?)
    }

    pub fn root(&self) -> &ConfigRoot {
        &self.root
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::new(ConfigPaths::for_root(&self.root, self.home_dir.as_deref()))
    }

    pub fn registry(&self) -> ServerRegistry {
        ServerRegistry::new(self.config_store())
    }

    pub fn tool_report_parser(&self) -> ToolReportParser {
        ToolReportParser::with_marker(self.settings.bullet_marker.clone())
    }

    /// Bridge over the given runtime collaborators.
    pub fn bridge(&self, runtime: AgentRuntime) -> ExecutionBridge {
        ExecutionBridge::new(self.registry(), runtime, self.settings.clone())
    }

    /// Bridge using stdio sessions and the OpenAI-compatible model client.
    pub fn default_bridge(&self) -> anyhow::Result<ExecutionBridge> {
        Ok(self.bridge(AgentRuntime::from_settings(&self.settings)?))
    }

    pub fn supervisor(&self, runtime: AgentRuntime) -> TaskSupervisor {
        TaskSupervisor::new(self.bridge(runtime))
    }
}
