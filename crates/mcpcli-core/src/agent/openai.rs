//! OpenAI-compatible chat completions client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::types::{ChatMessage, ChatRequest, Role, ToolCall, ToolInfo};
use super::{ModelFactory, ModelProvider};

/// Builds [`OpenAiChatModel`]s sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct OpenAiModels {
    client: Client,
    base_url: String,
}

impl OpenAiModels {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build OpenAI-compatible HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ModelFactory for OpenAiModels {
    fn create(
        &self,
        model: &str,
        api_key: Option<String>,
    ) -> anyhow::Result<Arc<dyn ModelProvider>> {
        Ok(Arc::new(OpenAiChatModel {
            client: self.client.clone(),
            url: format!("{}/chat/completions", self.base_url),
            model: model.to_string(),
            api_key,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatModel {
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolFunction,
}

#[derive(Debug, Serialize)]
struct WireToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// A JSON-encoded string on the wire; some servers send an object.
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireReply,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[async_trait]
impl ModelProvider for OpenAiChatModel {
    async fn generate(&self, request: ChatRequest) -> anyhow::Result<ChatMessage> {
        let payload = to_wire(request);
        debug!(model = %payload.model, messages = payload.messages.len(), "Requesting completion");

        let mut http = self.client.post(&self.url).json(&payload);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key);
        }
        let response = http
            .send()
            .await
            .context("failed to call OpenAI-compatible endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(anyhow!(
                "OpenAI-compatible endpoint returned HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            ));
        }

        let parsed: WireResponse = response
            .json()
            .await
            .context("failed to decode OpenAI-compatible response")?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenAI-compatible response had no choices"))?
            .message;
        Ok(from_wire(reply))
    }
}

fn to_wire(request: ChatRequest) -> WireRequest {
    WireRequest {
        model: request.model,
        messages: request.messages.into_iter().map(wire_message).collect(),
        tools: request.tools.into_iter().map(wire_tool).collect(),
    }
}

fn wire_message(message: ChatMessage) -> WireMessage {
    WireMessage {
        role: message.role,
        content: message.content,
        tool_calls: message
            .tool_calls
            .into_iter()
            .map(|call| WireToolCall {
                id: call.id,
                kind: function_kind(),
                function: WireFunctionCall {
                    name: call.name,
                    arguments: Value::String(call.arguments.to_string()),
                },
            })
            .collect(),
        tool_call_id: message.tool_call_id,
    }
}

fn wire_tool(tool: ToolInfo) -> WireTool {
    let parameters = match tool.input_schema {
        Some(schema) if schema.is_object() => schema,
        _ => json!({ "type": "object", "properties": {} }),
    };
    WireTool {
        kind: "function",
        function: WireToolFunction {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            parameters,
        },
    }
}

fn from_wire(reply: WireReply) -> ChatMessage {
    let tool_calls = reply
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            arguments: decode_arguments(&call.function.name, call.function.arguments),
            id: call.id,
            name: call.function.name,
        })
        .collect();
    ChatMessage {
        role: Role::Assistant,
        content: reply.content,
        tool_calls,
        tool_call_id: None,
    }
}

fn decode_arguments(tool: &str, raw: Value) -> Value {
    match raw {
        Value::String(text) if text.trim().is_empty() => json!({}),
        Value::String(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(tool, "Tool arguments are not valid JSON: {e}");
            json!({})
        }),
        Value::Null => json!({}),
        other => other,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
