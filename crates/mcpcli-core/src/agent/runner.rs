use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::types::{ChatMessage, ChatRequest, ToolInfo};
use super::{ModelProvider, ToolSession};
use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools provided by an MCP server. \
Use them when they help answer the user's request, then reply with a final answer.";

/// Tool-using agent bound to one model.
pub struct Agent {
    model: Arc<dyn ModelProvider>,
    model_name: String,
    max_steps: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelProvider>, model_name: impl Into<String>, max_steps: usize) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            max_steps,
        }
    }

    pub async fn available_tools(&self, session: &mut dyn ToolSession) -> Result<Vec<ToolInfo>> {
        session.list_tools().await.map_err(Error::external)
    }

    /// Answer `query`, letting the model call session tools for at most
    /// `max_steps` model turns.
    ///
    /// Cancellation is observed before every model turn.
    pub async fn run(
        &self,
        session: &mut dyn ToolSession,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let tools = self.available_tools(session).await?;
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)];

        for step in 1..=self.max_steps {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!(step, model = %self.model_name, "Agent step");

            let reply = self
                .model
                .generate(ChatRequest {
                    model: self.model_name.clone(),
                    messages: messages.clone(),
                    tools: tools.clone(),
                })
                .await
                .map_err(Error::external)?;

            if reply.tool_calls.is_empty() {
                info!(steps = step, "Agent finished");
                return Ok(reply.content.unwrap_or_default());
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in calls {
                debug!(tool = %call.name, "Calling tool");
                let content = match session.call_tool(&call.name, call.arguments).await {
                    Ok(result) => tool_result_text(&result),
                    Err(e) => format!("Error calling tool '{}': {e:#}", call.name),
                };
                messages.push(ChatMessage::tool_result(call.id, content));
            }
        }

        Err(Error::ExternalOperation(format!(
            "Agent stopped after reaching the limit of {} steps",
            self.max_steps
        )))
    }
}

/// Text parts of a `tools/call` result, or the raw JSON when it has none.
fn tool_result_text(result: &Value) -> String {
    let texts: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if texts.is_empty() {
        result.to_string()
    } else {
        texts.join("\n")
    }
}
