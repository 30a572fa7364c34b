//! Server registry: validated CRUD over the configuration store.
//!
//! Every operation is load → mutate → save. Nothing is cached between
//! calls, so independent CLI, GUI and HTTP invocations always see the file.
//! Concurrent writers are not serialized; the last `save` wins in full.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::config::{
    ConfigStore, Configuration, ServerDefinition, read_configuration, write_configuration,
};
use crate::error::{Error, Result};

/// Whether `add` created a new entry or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Replaced,
}

/// Partial update for an existing server.
///
/// Absent or empty fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerUpdate {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
}

impl ServerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    fn command(&self) -> Option<&str> {
        self.command.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn args(&self) -> Option<&Vec<String>> {
        self.args.as_ref().filter(|a| !a.is_empty())
    }

    fn env(&self) -> Option<&BTreeMap<String, String>> {
        self.env.as_ref().filter(|e| !e.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.command().is_none() && self.args().is_none() && self.env().is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ServerRegistry {
    store: ConfigStore,
}

impl ServerRegistry {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    /// All servers in configuration order.
    pub fn list(&self) -> Result<Vec<(String, ServerDefinition)>> {
        Ok(self.store.load()?.servers.into_iter().collect())
    }

    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.store.load()?.names())
    }

    pub fn get(&self, name: &str) -> Result<ServerDefinition> {
        let mut config = self.store.load()?;
        config
            .servers
            .remove(name)
            .ok_or_else(|| not_found(name, &config))
    }

    /// Add or silently replace a server definition.
    pub fn add(
        &self,
        name: &str,
        command: &str,
        args: Vec<String>,
        env: Option<BTreeMap<String, String>>,
    ) -> Result<AddOutcome> {
        let name = name.trim();
        let command = command.trim();
        if name.is_empty() {
            return Err(Error::Validation("Server name is required".to_string()));
        }
        if command.is_empty() {
            return Err(Error::Validation("Command is required".to_string()));
        }

        let mut config = self.store.load()?;
        let definition = ServerDefinition::new(command, args, env);
        let outcome = match config.servers.insert(name.to_string(), definition) {
            Some(_) => AddOutcome::Replaced,
            None => AddOutcome::Added,
        };
        self.store.save(&config)?;

        info!(server = name, ?outcome, "Saved server definition");
        Ok(outcome)
    }

    pub fn remove(&self, name: &str) -> Result<ServerDefinition> {
        let mut config = self.store.load()?;
        let removed = config
            .servers
            .remove(name)
            .ok_or_else(|| not_found(name, &config))?;
        self.store.save(&config)?;

        info!(server = name, "Removed server definition");
        Ok(removed)
    }

    /// Merge the present fields of `update` into an existing definition.
    pub fn update(&self, name: &str, update: &ServerUpdate) -> Result<ServerDefinition> {
        if update.is_empty() {
            return Err(Error::Validation(
                "At least one of command, args, or env must be provided".to_string(),
            ));
        }

        let mut config = self.store.load()?;
        let available = config.names();
        let definition = config.servers.get_mut(name).ok_or_else(|| Error::ServerNotFound {
            name: name.to_string(),
            available,
        })?;

        if let Some(command) = update.command() {
            definition.command = command.to_string();
        }
        if let Some(args) = update.args() {
            definition.args = args.clone();
        }
        if let Some(env) = update.env() {
            definition.env = Some(env.clone());
        }
        let updated = definition.clone();
        self.store.save(&config)?;

        info!(server = name, "Updated server definition");
        Ok(updated)
    }

    pub fn export_to(&self, path: &Path) -> Result<()> {
        let config = self.store.load()?;
        write_configuration(path, &config)?;

        info!(path = %path.display(), servers = config.servers.len(), "Exported configuration");
        Ok(())
    }

    /// Replace the configuration with the file at `path`.
    ///
    /// The existing configuration is untouched unless the file parses.
    pub fn import_from(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let config = read_configuration(path)?;
        validate_configuration(&config, path)?;
        self.store.save(&config)?;

        info!(path = %path.display(), servers = config.servers.len(), "Imported configuration");
        Ok(config.servers.len())
    }
}

fn not_found(name: &str, config: &Configuration) -> Error {
    Error::ServerNotFound {
        name: name.to_string(),
        available: config.names(),
    }
}

fn validate_configuration(config: &Configuration, path: &Path) -> Result<()> {
    for (name, definition) in &config.servers {
        if name.trim().is_empty() {
            return Err(Error::MalformedConfig {
                path: path.to_path_buf(),
                reason: "server name must not be empty".to_string(),
            });
        }
        if definition.command.trim().is_empty() {
            return Err(Error::MalformedConfig {
                path: path.to_path_buf(),
                reason: format!("server '{name}' has an empty command"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigPaths;
    use tempfile::TempDir;

    fn setup_test_env() -> (TempDir, ServerRegistry) {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(ConfigPaths::new(
            temp.path().join("config").join("config.json"),
            None,
        ));
        (temp, ServerRegistry::new(store))
    }

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // ==========================================================================
    // Add / get tests
    // ==========================================================================

    #[test]
    fn test_add_then_get_returns_submitted_fields() {
        let (_temp, registry) = setup_test_env();
        let args = vec!["-y".to_string(), "@mcp/fs".to_string()];

        let outcome = registry
            .add("fs", "npx", args.clone(), Some(env(&[("ROOT", "/data")])))
            .unwrap();

        assert_eq!(outcome, AddOutcome::Added);
        let def = registry.get("fs").unwrap();
        assert_eq!(def.command, "npx");
        assert_eq!(def.args, args);
        assert_eq!(def.env, Some(env(&[("ROOT", "/data")])));
    }

    #[test]
    fn test_add_same_name_overwrites() {
        let (_temp, registry) = setup_test_env();
        registry.add("fs", "npx", vec!["a".to_string()], None).unwrap();

        let outcome = registry.add("fs", "uvx", vec!["b".to_string()], None).unwrap();

        assert_eq!(outcome, AddOutcome::Replaced);
        let servers = registry.list().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].1.command, "uvx");
        assert_eq!(servers[0].1.args, vec!["b".to_string()]);
    }

    #[test]
    fn test_add_requires_name_and_command() {
        let (_temp, registry) = setup_test_env();

        let err = registry.add("  ", "npx", vec![], None).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("name")));

        let err = registry.add("fs", "", vec![], None).unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m.contains("Command")));

        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_get_unknown_lists_available() {
        let (_temp, registry) = setup_test_env();
        registry.add("alpha", "a", vec![], None).unwrap();
        registry.add("beta", "b", vec![], None).unwrap();

        let err = registry.get("gamma").unwrap_err();

        match err {
            Error::ServerNotFound { name, available } => {
                assert_eq!(name, "gamma");
                assert_eq!(available, vec!["alpha".to_string(), "beta".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // ==========================================================================
    // Remove tests
    // ==========================================================================

    #[test]
    fn test_remove_deletes_and_persists() {
        let (_temp, registry) = setup_test_env();
        registry.add("fs", "npx", vec![], None).unwrap();

        let removed = registry.remove("fs").unwrap();

        assert_eq!(removed.command, "npx");
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_leaves_file_untouched() {
        let (_temp, registry) = setup_test_env();
        registry.add("fs", "npx", vec![], None).unwrap();
        let path = registry.config_store().config_path().to_path_buf();
        let before = std::fs::read(&path).unwrap();

        let err = registry.remove("nope").unwrap_err();

        assert!(matches!(err, Error::ServerNotFound { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    // ==========================================================================
    // Update tests
    // ==========================================================================

    #[test]
    fn test_update_merges_fields() {
        let (_temp, registry) = setup_test_env();
        registry
            .add(
                "fs",
                "npx",
                vec!["-y".to_string()],
                Some(env(&[("A", "1")])),
            )
            .unwrap();

        let updated = registry
            .update("fs", &ServerUpdate::new().with_command("bunx"))
            .unwrap();

        assert_eq!(updated.command, "bunx");
        assert_eq!(updated.args, vec!["-y".to_string()]);
        assert_eq!(updated.env, Some(env(&[("A", "1")])));
        assert_eq!(registry.get("fs").unwrap(), updated);
    }

    #[test]
    fn test_update_requires_a_field() {
        let (_temp, registry) = setup_test_env();
        registry.add("fs", "npx", vec![], None).unwrap();

        let empty = ServerUpdate::new()
            .with_command(" ")
            .with_args(vec![])
            .with_env(BTreeMap::new());
        let err = registry.update("fs", &empty).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_update_unknown_server() {
        let (_temp, registry) = setup_test_env();

        let err = registry
            .update("ghost", &ServerUpdate::new().with_command("x"))
            .unwrap_err();

        assert!(matches!(err, Error::ServerNotFound { .. }));
    }

    // ==========================================================================
    // Export / import tests
    // ==========================================================================

    #[test]
    fn test_import_missing_file() {
        let (temp, registry) = setup_test_env();

        let err = registry
            .import_from(&temp.path().join("missing.json"))
            .unwrap_err();

        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_import_malformed_keeps_existing() {
        let (temp, registry) = setup_test_env();
        registry.add("keep", "npx", vec![], None).unwrap();
        let bad = temp.path().join("bad.json");
        std::fs::write(&bad, "{\"mcpServers\": [").unwrap();

        let err = registry.import_from(&bad).unwrap_err();

        assert!(matches!(err, Error::MalformedConfig { .. }));
        assert_eq!(registry.names().unwrap(), vec!["keep".to_string()]);
    }

    #[test]
    fn test_import_rejects_empty_command() {
        let (temp, registry) = setup_test_env();
        let file = temp.path().join("empty-cmd.json");
        std::fs::write(&file, r#"{"mcpServers": {"x": {"command": ""}}}"#).unwrap();

        let err = registry.import_from(&file).unwrap_err();

        assert!(matches!(err, Error::MalformedConfig { .. }));
    }
}
