use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::types::ToolInfo;
use super::{SessionConnector, ToolSession};
use crate::config::ServerDefinition;

const PROTOCOL_VERSION: &str = "2024-11-05";
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Launches each server as a child process and speaks JSON-RPC over its stdio.
#[derive(Debug, Clone)]
pub struct StdioConnector {
    timeout: Duration,
}

impl StdioConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SessionConnector for StdioConnector {
    async fn connect(
        &self,
        name: &str,
        server: &ServerDefinition,
    ) -> anyhow::Result<Box<dyn ToolSession>> {
        let mut session = StdioSession::spawn(name, server, self.timeout)?;
        session.initialize().await?;
        Ok(Box::new(session))
    }
}

pub struct StdioSession {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    timeout: Duration,
}

impl StdioSession {
    pub fn spawn(name: &str, server: &ServerDefinition, timeout: Duration) -> anyhow::Result<Self> {
        let mut command = Command::new(&server.command);
        command
            .args(&server.args)
            .envs(server.env_or_empty())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().with_context(|| {
            format!(
                "failed to spawn MCP server '{name}' (command='{}', args={:?})",
                server.command, server.args
            )
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("failed to open MCP stdin for '{name}'"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("failed to open MCP stdout for '{name}'"))?;
        if let Some(stderr) = child.stderr.take() {
            let server_name = name.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = %server_name, "{line}");
                }
            });
        }

        Ok(Self {
            name: name.to_string(),
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            timeout,
        })
    }

    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "mcp-cli", "version": env!("CARGO_PKG_VERSION") }
        });
        self.call("initialize", params).await?;
        self.notify("notifications/initialized", json!({})).await
    }

    async fn call(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }))
        .await?;

        let message = match tokio::time::timeout(self.timeout, self.read_response(id)).await {
            Ok(message) => message?,
            Err(_) => {
                self.notify(
                    "notifications/cancelled",
                    json!({ "requestId": id, "reason": "timeout" }),
                )
                .await
                .ok();
                return Err(anyhow!("MCP call timed out for method '{method}'"));
            }
        };

        if let Some(err) = message.get("error") {
            return Err(anyhow!("MCP error for method '{method}': {err}"));
        }
        Ok(message.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn notify(&mut self, method: &str, params: Value) -> anyhow::Result<()> {
        self.send(&json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await
    }

    async fn send(&mut self, message: &Value) -> anyhow::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow!("MCP session '{}' is closed", self.name))?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .context("failed to write MCP request")?;
        stdin.flush().await.context("failed to flush MCP request")
    }

    /// Read until the response for `id`, skipping notifications, server
    /// requests and non-JSON noise.
    async fn read_response(&mut self, id: u64) -> anyhow::Result<Value> {
        loop {
            let Some(line) = self.stdout.next_line().await? else {
                return Err(anyhow!("MCP server '{}' closed its output", self.name));
            };
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                debug!(server = %self.name, "Ignoring non-JSON output: {line}");
                continue;
            };
            if message.get("method").is_some() {
                continue;
            }
            if message.get("id").and_then(Value::as_u64) == Some(id) {
                return Ok(message);
            }
        }
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<ToolInfo>> {
        let result = self.call("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or(Value::Array(vec![]));
        Ok(serde_json::from_value(tools)?)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<Value> {
        self.call("tools/call", json!({ "name": name, "arguments": arguments }))
            .await
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        // Closing stdin asks a well-behaved server to exit on its own.
        drop(self.stdin.take());
        match tokio::time::timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(status) => {
                debug!(server = %self.name, status = ?status?, "MCP server exited");
            }
            Err(_) => {
                warn!(server = %self.name, "MCP server did not exit, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }
}
