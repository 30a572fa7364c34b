//! Test state with fake agent collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use mcpcli_api::state::AppState;
use mcpcli_core::agent::{
    AgentRuntime, ChatMessage, ChatRequest, Credentials, ModelFactory, ModelProvider,
    SessionConnector, ToolInfo, ToolSession,
};
use mcpcli_core::config::{ConfigRoot, ServerDefinition};
use mcpcli_core::context::AppContext;
use mcpcli_core::settings::Settings;

struct FakeConnector;

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(
        &self,
        _name: &str,
        _server: &ServerDefinition,
    ) -> anyhow::Result<Box<dyn ToolSession>> {
        Ok(Box::new(FakeSession))
    }
}

struct FakeSession;

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<ToolInfo>> {
        Ok(vec![ToolInfo {
            name: "read_file".to_string(),
            description: Some("Read a file".to_string()),
            input_schema: Some(json!({"type": "object"})),
        }])
    }

    async fn call_tool(&mut self, _name: &str, _arguments: Value) -> anyhow::Result<Value> {
        Ok(json!({}))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FakeModels;

impl ModelFactory for FakeModels {
    fn create(
        &self,
        _model: &str,
        _api_key: Option<String>,
    ) -> anyhow::Result<Arc<dyn ModelProvider>> {
        Ok(Arc::new(FakeModel))
    }
}

struct FakeModel;

#[async_trait]
impl ModelProvider for FakeModel {
    async fn generate(&self, _request: ChatRequest) -> anyhow::Result<ChatMessage> {
        Ok(ChatMessage::assistant("forty-two"))
    }
}

struct FixedCredentials(Option<String>);

impl Credentials for FixedCredentials {
    fn get(&self, _key: &str) -> Option<String> {
        self.0.clone()
    }
}

pub struct TestApp {
    pub temp: TempDir,
    pub state: AppState,
}

pub fn test_app(api_key: Option<&str>) -> TestApp {
    let temp = TempDir::new().unwrap();
    let ctx = AppContext::with_settings(
        ConfigRoot::new(temp.path().join("root")),
        None,
        Settings::default(),
    );
    let runtime = AgentRuntime::new(
        Arc::new(FakeConnector),
        Arc::new(FakeModels),
        Arc::new(FixedCredentials(api_key.map(str::to_string))),
    );
    let state = mcpcli_api::bootstrap(&ctx, runtime);
    TestApp { temp, state }
}
