//! Fake runtime collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use mcpcli_core::agent::{
    AgentRuntime, ChatMessage, ChatRequest, Credentials, ModelFactory, ModelProvider,
    SessionConnector, ToolInfo, ToolSession,
};
use mcpcli_core::config::{ConfigPaths, ConfigStore, ServerDefinition};
use mcpcli_core::registry::ServerRegistry;

#[derive(Default)]
pub struct Counters {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub generates: AtomicUsize,
    pub connected_to: Mutex<Vec<String>>,
}

impl Counters {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn generates(&self) -> usize {
        self.generates.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub enum ModelBehavior {
    Answer(String),
    Fail(String),
}

#[derive(Clone)]
pub struct FakeConnector {
    pub counters: Arc<Counters>,
    pub tools: Vec<ToolInfo>,
    pub list_delay: Option<Duration>,
    pub panic_on_connect: bool,
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(
        &self,
        name: &str,
        _server: &ServerDefinition,
    ) -> anyhow::Result<Box<dyn ToolSession>> {
        if self.panic_on_connect {
            panic!("connector exploded");
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.counters
            .connected_to
            .lock()
            .unwrap()
            .push(name.to_string());
        Ok(Box::new(FakeSession {
            counters: Arc::clone(&self.counters),
            tools: self.tools.clone(),
            list_delay: self.list_delay,
        }))
    }
}

pub struct FakeSession {
    counters: Arc<Counters>,
    tools: Vec<ToolInfo>,
    list_delay: Option<Duration>,
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&mut self) -> anyhow::Result<Vec<ToolInfo>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.tools.clone())
    }

    async fn call_tool(&mut self, name: &str, _arguments: Value) -> anyhow::Result<Value> {
        Ok(json!({"content": [{"type": "text", "text": format!("called {name}")}]}))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeModels {
    pub counters: Arc<Counters>,
    pub behavior: ModelBehavior,
}

struct FakeModel {
    counters: Arc<Counters>,
    behavior: ModelBehavior,
}

impl ModelFactory for FakeModels {
    fn create(
        &self,
        _model: &str,
        _api_key: Option<String>,
    ) -> anyhow::Result<Arc<dyn ModelProvider>> {
        Ok(Arc::new(FakeModel {
            counters: Arc::clone(&self.counters),
            behavior: self.behavior.clone(),
        }))
    }
}

#[async_trait]
impl ModelProvider for FakeModel {
    async fn generate(&self, _request: ChatRequest) -> anyhow::Result<ChatMessage> {
        self.counters.generates.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ModelBehavior::Answer(text) => Ok(ChatMessage::assistant(text.clone())),
            ModelBehavior::Fail(message) => Err(anyhow::anyhow!(message.clone())),
        }
    }
}

pub struct FixedCredentials(pub Option<String>);

impl Credentials for FixedCredentials {
    fn get(&self, _key: &str) -> Option<String> {
        self.0.clone()
    }
}

pub fn echo_tool() -> ToolInfo {
    ToolInfo {
        name: "echo".to_string(),
        description: Some("Echo input".to_string()),
        input_schema: Some(json!({"type": "object"})),
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub registry: ServerRegistry,
    pub counters: Arc<Counters>,
    pub connector: FakeConnector,
    pub behavior: ModelBehavior,
    pub api_key: Option<String>,
}

impl Harness {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::new(ConfigPaths::new(
            temp.path().join("config").join("config.json"),
            None,
        ));
        let registry = ServerRegistry::new(store);
        registry.add("files", "npx", vec!["server-files".to_string()], None).unwrap();
        registry.add("other", "uvx", vec![], None).unwrap();

        let counters = Arc::new(Counters::default());
        let connector = FakeConnector {
            counters: Arc::clone(&counters),
            tools: vec![echo_tool()],
            list_delay: None,
            panic_on_connect: false,
        };

        Self {
            temp,
            registry,
            counters,
            connector,
            behavior: ModelBehavior::Answer("the answer".to_string()),
            api_key: Some("sk-test".to_string()),
        }
    }

    pub fn runtime(&self) -> AgentRuntime {
        AgentRuntime::new(
            Arc::new(self.connector.clone()),
            Arc::new(FakeModels {
                counters: Arc::clone(&self.counters),
                behavior: self.behavior.clone(),
            }),
            Arc::new(FixedCredentials(self.api_key.clone())),
        )
    }
}
