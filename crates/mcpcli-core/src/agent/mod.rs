//! Agent runtime seams.
//!
//! The bridge talks to three collaborators through traits so surfaces and
//! tests can swap them:
//! - [`SessionConnector`] opens a [`ToolSession`] to exactly one server
//! - [`ModelFactory`] builds a [`ModelProvider`] for a named model
//! - [`Credentials`] looks up secrets such as the model API key
//!
//! Defaults talk newline-delimited JSON-RPC over a child process's stdio
//! and an OpenAI-compatible chat completions endpoint.

pub mod openai;
pub mod runner;
pub mod stdio;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ServerDefinition;
use crate::settings::Settings;

pub use openai::{OpenAiChatModel, OpenAiModels};
pub use runner::Agent;
pub use stdio::{StdioConnector, StdioSession};
pub use types::{ChatMessage, ChatRequest, Role, ToolCall, ToolInfo};

/// Live connection to one tool server, used for one operation.
#[async_trait]
pub trait ToolSession: Send {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<ToolInfo>>;

    async fn call_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<Value>;

    /// Release the session. Must be safe to call once per session on any path.
    async fn close(&mut self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Open a session scoped to the single server `name`.
    async fn connect(
        &self,
        name: &str,
        server: &ServerDefinition,
    ) -> anyhow::Result<Box<dyn ToolSession>>;
}

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Produce the next assistant message, possibly containing tool calls.
    async fn generate(&self, request: ChatRequest) -> anyhow::Result<ChatMessage>;
}

pub trait ModelFactory: Send + Sync {
    fn create(&self, model: &str, api_key: Option<String>)
    -> anyhow::Result<Arc<dyn ModelProvider>>;
}

pub trait Credentials: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl Credentials for EnvCredentials {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Bundle of collaborators used by the execution bridge.
#[derive(Clone)]
pub struct AgentRuntime {
    pub connector: Arc<dyn SessionConnector>,
    pub models: Arc<dyn ModelFactory>,
    pub credentials: Arc<dyn Credentials>,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime").finish_non_exhaustive()
    }
}

impl AgentRuntime {
    pub fn new(
        connector: Arc<dyn SessionConnector>,
        models: Arc<dyn ModelFactory>,
        credentials: Arc<dyn Credentials>,
    ) -> Self {
        Self {
            connector,
            models,
            credentials,
        }
    }

    /// Stdio sessions, OpenAI-compatible models, environment credentials.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = settings.request_timeout();
        Ok(Self::new(
            Arc::new(StdioConnector::new(timeout)),
            Arc::new(OpenAiModels::new(&settings.openai_base_url, timeout)?),
            Arc::new(EnvCredentials),
        ))
    }
}
