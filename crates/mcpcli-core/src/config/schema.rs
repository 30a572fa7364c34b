//! On-disk configuration schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Root of `config.json`.
///
/// ```json
/// { "mcpServers": { "<name>": { "command": "...", "args": [], "env": {} } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(rename = "mcpServers", default)]
    pub servers: BTreeMap<String, ServerDefinition>,

    /// Unknown root keys, kept so import/export does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }
}

/// How to launch one tool-providing server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Executable or launcher (e.g. `npx`)
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the server process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,

    /// Fields other tools write (e.g. `cwd`), preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerDefinition {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        env: Option<BTreeMap<String, String>>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            env: env.filter(|e| !e.is_empty()),
            extra: Map::new(),
        }
    }

    /// Environment map, empty when none is configured.
    pub fn env_or_empty(&self) -> BTreeMap<String, String> {
        self.env.clone().unwrap_or_default()
    }

    /// `command arg1 arg2` as shown in listings.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_server() {
        let config: Configuration =
            serde_json::from_str(r#"{"mcpServers": {"fs": {"command": "npx"}}}"#).unwrap();

        let fs = &config.servers["fs"];
        assert_eq!(fs.command, "npx");
        assert!(fs.args.is_empty());
        assert!(fs.env.is_none());
    }

    #[test]
    fn test_missing_servers_key_is_empty() {
        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let input = r#"{"mcpServers":{"a":{"command":"x","cwd":"/tmp"}},"version":2}"#;
        let config: Configuration = serde_json::from_str(input).unwrap();

        assert_eq!(config.extra.get("version"), Some(&Value::from(2)));
        assert_eq!(
            config.servers["a"].extra.get("cwd"),
            Some(&Value::from("/tmp"))
        );

        let output = serde_json::to_string(&config).unwrap();
        let reparsed: Configuration = serde_json::from_str(&output).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_env_must_be_flat_strings() {
        let result: Result<Configuration, _> = serde_json::from_str(
            r#"{"mcpServers": {"a": {"command": "x", "env": {"K": {"nested": true}}}}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_env_is_dropped_on_construction() {
        let def = ServerDefinition::new("npx", vec![], Some(BTreeMap::new()));
        assert!(def.env.is_none());
        assert!(def.env_or_empty().is_empty());
    }

    #[test]
    fn test_command_line() {
        let def = ServerDefinition::new(
            "npx",
            vec!["-y".to_string(), "@mcp/fs".to_string()],
            None,
        );
        assert_eq!(def.command_line(), "npx -y @mcp/fs");
    }
}
