mod support;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mcpcli_core::ErrorKind;
use mcpcli_core::bridge::{
    ExecutionBridge, OperationPayload, OperationRequest, TaskSupervisor,
};
use mcpcli_core::settings::Settings;
use mcpcli_core::tool_report::{ToolReportParser, DEFAULT_BULLET_MARKER};

use support::{Harness, ModelBehavior};

fn bridge(harness: &Harness) -> ExecutionBridge {
    ExecutionBridge::new(harness.registry.clone(), harness.runtime(), Settings::default())
}

#[test]
fn query_emits_status_lines_in_order() {
    let harness = Harness::new();
    let handle = bridge(&harness).spawn(OperationRequest::query("files", "list files", None));

    let mut streamed = Vec::new();
    let outcome = handle.wait(|line| streamed.push(line.to_string()));

    assert_eq!(
        outcome.lines,
        vec![
            "Connecting to MCP server 'files'...",
            "Using OpenAI model 'gpt-3.5-turbo'...",
            "Initializing agent...",
            "Running query: list files",
            "Processing (this may take a moment)...",
            "\n--- Result ---",
            "the answer",
            "-------------",
            "Closing sessions...",
        ]
    );
    assert_eq!(streamed, outcome.lines);
    assert_eq!(outcome.result, Ok(OperationPayload::Text("the answer".to_string())));
    assert_eq!(harness.counters.closes(), 1);
}

#[test]
fn query_uses_requested_model() {
    let harness = Harness::new();
    let outcome = bridge(&harness)
        .spawn(OperationRequest::query("files", "q", Some("gpt-4o".to_string())))
        .wait(|_| {});

    assert_eq!(outcome.lines[1], "Using OpenAI model 'gpt-4o'...");
}

#[test]
fn session_is_scoped_to_requested_server() {
    let harness = Harness::new();
    bridge(&harness)
        .spawn(OperationRequest::query("other", "q", None))
        .wait(|_| {});

    assert_eq!(*harness.counters.connected_to.lock().unwrap(), vec!["other"]);
}

#[test]
fn unknown_server_never_connects() {
    let harness = Harness::new();
    let outcome = bridge(&harness)
        .spawn(OperationRequest::query("nope", "q", None))
        .wait(|_| {});

    let report = outcome.error().unwrap();
    assert_eq!(report.kind, ErrorKind::NotFound);
    assert_eq!(report.available_servers, vec!["files", "other"]);
    assert_eq!(outcome.lines[0], "Error: Server 'nope' not found");
    assert_eq!(harness.counters.connects(), 0);
}

#[test]
fn query_requires_credential() {
    let mut harness = Harness::new();
    harness.api_key = None;

    let outcome = bridge(&harness)
        .spawn(OperationRequest::query("files", "q", None))
        .wait(|_| {});

    assert_eq!(outcome.error().unwrap().kind, ErrorKind::MissingCredential);
    assert_eq!(
        outcome.lines[0],
        "Error: OPENAI_API_KEY environment variable not set"
    );
    assert_eq!(harness.counters.connects(), 0);
}

#[test]
fn discovery_works_without_credential() {
    let mut harness = Harness::new();
    harness.api_key = None;

    let outcome = bridge(&harness)
        .spawn(OperationRequest::discover("files", None))
        .wait(|_| {});

    assert_eq!(outcome.lines[0], "Connecting to MCP server 'files'...");
    assert_eq!(outcome.lines[1], "Initializing agent to discover tools...");
    assert_eq!(outcome.lines[2], "\nTools available from 'files':");
    assert_eq!(outcome.lines[3], format!("\n{DEFAULT_BULLET_MARKER}echo"));

    let parsed = ToolReportParser::new().parse(&outcome.transcript());
    let records = outcome.into_tools().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "echo");
    assert_eq!(parsed, records);
    assert_eq!(harness.counters.generates(), 0);
    assert_eq!(harness.counters.closes(), 1);
}

#[test]
fn discovery_reports_empty_server() {
    let mut harness = Harness::new();
    harness.connector.tools.clear();

    let outcome = bridge(&harness)
        .spawn(OperationRequest::discover("files", None))
        .wait(|_| {});

    assert_eq!(outcome.lines.last().unwrap(), "No tools found in server 'files'");
    assert_eq!(outcome.into_tools().unwrap(), Vec::new());
}

#[test]
fn agent_failure_still_closes_session() {
    let mut harness = Harness::new();
    harness.behavior = ModelBehavior::Fail("rate limited".to_string());

    let outcome = bridge(&harness)
        .spawn(OperationRequest::query("files", "q", None))
        .wait(|_| {});

    let report = outcome.error().unwrap();
    assert_eq!(report.kind, ErrorKind::ExternalOperation);
    assert!(report.message.contains("rate limited"));
    assert!(outcome.lines.contains(&"Closing sessions...".to_string()));
    assert_eq!(outcome.lines.last().unwrap(), "Error: rate limited");
    assert_eq!(harness.counters.closes(), 1);
}

#[test]
fn cancelled_before_start_never_connects() {
    let harness = Harness::new();
    let token = CancellationToken::new();
    token.cancel();

    let outcome = bridge(&harness)
        .spawn_with(OperationRequest::query("files", "q", None), token)
        .wait(|_| {});

    assert_eq!(outcome.error().unwrap().kind, ErrorKind::Cancelled);
    assert_eq!(harness.counters.connects(), 0);
    assert_eq!(harness.counters.generates(), 0);
}

#[test]
fn cancel_after_start_stops_before_model_turn() {
    let mut harness = Harness::new();
    harness.connector.list_delay = Some(Duration::from_millis(200));

    let handle = bridge(&harness).spawn(OperationRequest::query("files", "q", None));
    std::thread::sleep(Duration::from_millis(50));
    handle.cancel();
    let outcome = handle.wait(|_| {});

    assert_eq!(outcome.error().unwrap().kind, ErrorKind::Cancelled);
    assert_eq!(harness.counters.generates(), 0);
    assert_eq!(harness.counters.closes(), harness.counters.connects());
}

#[test]
fn panicking_worker_is_reported() {
    let mut harness = Harness::new();
    harness.connector.panic_on_connect = true;

    let outcome = bridge(&harness)
        .spawn(OperationRequest::discover("files", None))
        .wait(|_| {});

    let report = outcome.error().unwrap();
    assert_eq!(report.kind, ErrorKind::ExternalOperation);
    assert_eq!(report.message, "operation terminated unexpectedly");
}

#[tokio::test]
async fn finish_resolves_from_async_context() {
    let harness = Harness::new();
    let outcome = bridge(&harness)
        .spawn(OperationRequest::query("files", "q", None))
        .finish()
        .await;

    assert!(outcome.is_success());
    assert_eq!(outcome.into_text().unwrap(), "the answer");
}

#[tokio::test]
async fn supervisor_runs_operations() {
    let harness = Harness::new();
    let supervisor = TaskSupervisor::new(bridge(&harness));

    let first = supervisor.start(OperationRequest::query("files", "q", None));
    let second = supervisor.start(OperationRequest::discover("other", None));
    assert_ne!(first.id(), second.id());

    assert!(first.finish().await.is_success());
    assert!(second.finish().await.is_success());
}

#[test]
fn supervisor_shutdown_cancels_and_joins() {
    let mut harness = Harness::new();
    harness.connector.list_delay = Some(Duration::from_millis(300));
    let supervisor = TaskSupervisor::new(bridge(&harness));

    let pending = supervisor.start(OperationRequest::query("files", "q", None));
    supervisor.start(OperationRequest::query("other", "q", None));

    supervisor.shutdown();
    assert_eq!(supervisor.active(), 0);
    assert_eq!(harness.counters.generates(), 0);
    assert_eq!(harness.counters.closes(), harness.counters.connects());

    let outcome = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(pending.finish());
    assert_eq!(outcome.error().unwrap().kind, ErrorKind::Cancelled);

    // Second call has nothing left to do.
    supervisor.shutdown();
}

#[tokio::test]
async fn dropped_finish_cancels_operation() {
    let mut harness = Harness::new();
    harness.connector.list_delay = Some(Duration::from_millis(300));

    let handle = bridge(&harness).spawn(OperationRequest::query("files", "q", None));
    let token = handle.cancellation_token();
    let finished = tokio::time::timeout(Duration::from_millis(50), handle.finish()).await;

    assert!(finished.is_err());
    assert!(token.is_cancelled());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(harness.counters.generates(), 0);
    assert_eq!(harness.counters.closes(), harness.counters.connects());
}
