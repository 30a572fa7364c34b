//! Add/edit server form.

use std::collections::BTreeMap;

use mcpcli_core::config::ServerDefinition;
use mcpcli_core::registry::ServerUpdate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerForm {
    pub name: String,
    pub command: String,
    /// Whitespace-separated arguments
    pub args: String,
    /// `KEY=VALUE` pairs separated by commas or newlines
    pub env: String,
    /// Name of the server being edited; `None` when adding
    pub editing: Option<String>,
}

impl ServerForm {
    pub fn edit(name: &str, server: &ServerDefinition) -> Self {
        Self {
            name: name.to_string(),
            command: server.command.clone(),
            args: server.args.join(" "),
            env: server
                .env_or_empty()
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(", "),
            editing: Some(name.to_string()),
        }
    }

    pub fn args(&self) -> Vec<String> {
        self.args.split_whitespace().map(str::to_string).collect()
    }

    pub fn env(&self) -> Result<BTreeMap<String, String>, String> {
        self.env
            .split([',', '\n'])
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid environment variable '{pair}', expected KEY=VALUE"))?;
                Ok((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    /// Update carrying the non-empty fields of the form.
    pub fn update(&self) -> Result<ServerUpdate, String> {
        let mut update = ServerUpdate::new();
        if !self.command.trim().is_empty() {
            update = update.with_command(self.command.trim());
        }
        let args = self.args();
        if !args.is_empty() {
            update = update.with_args(args);
        }
        let env = self.env()?;
        if !env.is_empty() {
            update = update.with_env(env);
        }
        Ok(update)
    }
}
