use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::handle::OperationHandle;
use super::{ErrorReport, OperationId, OperationOutcome, OperationPayload, OperationRequest};
use crate::agent::{Agent, AgentRuntime, ToolSession};
use crate::error::{Error, Result};
use crate::registry::ServerRegistry;
use crate::settings::Settings;
use crate::tool_report::{self, ToolRecord};

/// Credential required to run a query. Discovery never asks for it.
pub const CREDENTIAL_VAR: &str = "OPENAI_API_KEY";

/// Runs agent operations on isolated worker threads.
#[derive(Clone)]
pub struct ExecutionBridge {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ServerRegistry,
    runtime: AgentRuntime,
    settings: Settings,
    next_id: AtomicU64,
}

impl ExecutionBridge {
    pub fn new(registry: ServerRegistry, runtime: AgentRuntime, settings: Settings) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                runtime,
                settings,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Start `request` on a dedicated thread and return its handle.
    pub fn spawn(&self, request: OperationRequest) -> OperationHandle {
        self.spawn_with(request, CancellationToken::new())
    }

    /// Like [`spawn`](Self::spawn), observing a caller-owned token.
    pub fn spawn_with(&self, request: OperationRequest, cancel: CancellationToken) -> OperationHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        debug!(id, server = request.server(), "Spawning operation");
        let thread = std::thread::Builder::new()
            .name(format!("mcp-operation-{id}"))
            .spawn(move || {
                let outcome = run_isolated(&inner, id, request, &token, line_tx);
                outcome_tx.send(outcome).ok();
            });

        let thread = match thread {
            Ok(thread) => Some(thread),
            Err(e) => {
                // The closure and its senders are gone, so the handle
                // resolves to a terminated outcome.
                error!(id, "Failed to spawn operation thread: {e}");
                None
            }
        };

        OperationHandle {
            id,
            cancel,
            lines: line_rx,
            outcome: outcome_rx,
            thread,
        }
    }
}

/// Collects status lines and forwards them to the live channel.
struct Reporter {
    live: mpsc::UnboundedSender<String>,
    lines: Vec<String>,
}

impl Reporter {
    fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        // Receiver may be gone when the caller only awaits the outcome.
        self.live.send(line.clone()).ok();
        self.lines.push(line);
    }

    fn finish(mut self, id: OperationId, result: Result<OperationPayload>) -> OperationOutcome {
        let result = result.map_err(|err| {
            let report = ErrorReport::from(&err);
            for line in report.display_lines() {
                self.line(line);
            }
            report
        });
        OperationOutcome {
            id,
            lines: self.lines,
            result,
        }
    }
}

fn run_isolated(
    inner: &Inner,
    id: OperationId,
    request: OperationRequest,
    cancel: &CancellationToken,
    live: mpsc::UnboundedSender<String>,
) -> OperationOutcome {
    let mut reporter = Reporter {
        live,
        lines: Vec::new(),
    };

    if cancel.is_cancelled() {
        return reporter.finish(id, Err(Error::Cancelled));
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let err = Error::ExternalOperation(format!("failed to start execution context: {e}"));
            return reporter.finish(id, Err(err));
        }
    };

    let result = runtime.block_on(async {
        match request {
            OperationRequest::RunQuery {
                server,
                query,
                model,
            } => run_query(inner, &server, &query, model.as_deref(), cancel, &mut reporter)
                .await
                .map(OperationPayload::Text),
            OperationRequest::DiscoverTools { server, model } => {
                discover_tools(inner, &server, model.as_deref(), &mut reporter)
                    .await
                    .map(OperationPayload::Tools)
            }
        }
    });
    drop(runtime);

    reporter.finish(id, result)
}

async fn run_query(
    inner: &Inner,
    server: &str,
    query: &str,
    model: Option<&str>,
    cancel: &CancellationToken,
    reporter: &mut Reporter,
) -> Result<String> {
    let definition = inner.registry.get(server)?;
    let api_key = inner
        .runtime
        .credentials
        .get(CREDENTIAL_VAR)
        .ok_or_else(|| Error::MissingCredential(CREDENTIAL_VAR.to_string()))?;
    let model = inner.settings.model_or_default(model);

    reporter.line(format!("Connecting to MCP server '{server}'..."));
    let mut session = inner
        .runtime
        .connector
        .connect(server, &definition)
        .await
        .map_err(Error::external)?;

    let result: Result<String> = async {
        reporter.line(format!("Using OpenAI model '{model}'..."));
        let provider = inner
            .runtime
            .models
            .create(&model, Some(api_key))
            .map_err(Error::external)?;

        reporter.line("Initializing agent...");
        let agent = Agent::new(provider, model.as_str(), inner.settings.max_steps);

        reporter.line(format!("Running query: {query}"));
        reporter.line("Processing (this may take a moment)...");
        let answer = agent.run(session.as_mut(), query, cancel).await?;

        reporter.line("\n--- Result ---");
        reporter.line(answer.clone());
        reporter.line("-------------");
        Ok(answer)
    }
    .await;

    reporter.line("Closing sessions...");
    close_session(server, session.as_mut()).await;
    result
}

async fn discover_tools(
    inner: &Inner,
    server: &str,
    model: Option<&str>,
    reporter: &mut Reporter,
) -> Result<Vec<ToolRecord>> {
    let definition = inner.registry.get(server)?;
    // Listing tools never calls the model, so the key is optional here.
    let api_key = inner.runtime.credentials.get(CREDENTIAL_VAR);
    let model = inner.settings.model_or_default(model);

    reporter.line(format!("Connecting to MCP server '{server}'..."));
    let mut session = inner
        .runtime
        .connector
        .connect(server, &definition)
        .await
        .map_err(Error::external)?;

    let result: Result<Vec<ToolRecord>> = async {
        let provider = inner
            .runtime
            .models
            .create(&model, api_key)
            .map_err(Error::external)?;
        let agent = Agent::new(provider, model.as_str(), inner.settings.max_steps);

        reporter.line("Initializing agent to discover tools...");
        let records: Vec<ToolRecord> = agent
            .available_tools(session.as_mut())
            .await?
            .into_iter()
            .map(ToolRecord::from)
            .collect();

        if records.is_empty() {
            reporter.line(format!("No tools found in server '{server}'"));
        } else {
            reporter.line(format!("\nTools available from '{server}':"));
            for line in tool_report::render(&records, &inner.settings.bullet_marker) {
                reporter.line(line);
            }
        }
        Ok(records)
    }
    .await;

    close_session(server, session.as_mut()).await;
    result
}

async fn close_session(server: &str, session: &mut dyn ToolSession) {
    if let Err(e) = session.close().await {
        warn!(server, "Failed to close session: {e:#}");
    }
}
