//! Agent-backed endpoints. Each request runs one bridge operation and waits
//! for it before answering.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mcpcli_core::bridge::{OperationPayload, OperationRequest};
use mcpcli_core::tool_report::ToolRecord;

use super::{parse_body, required};
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub server: Option<String>,
    pub query: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: &'static str,
    pub result: String,
    /// Status lines emitted while the query ran
    pub output: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToolsParams {
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub status: &'static str,
    pub tools: Vec<ToolRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub tools: Vec<ToolRecord>,
}

pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, HttpError> {
    let request: QueryRequest = parse_body(payload)?;
    let server = required(request.server, "Server name is required")?;
    let query = required(request.query, "Query is required")?;

    let outcome = state
        .bridge
        .spawn(OperationRequest::query(server, query, request.model))
        .finish()
        .await;

    match outcome.result {
        Ok(OperationPayload::Text(result)) => Ok(Json(QueryResponse {
            status: "success",
            result,
            output: outcome.lines,
        })),
        Ok(OperationPayload::Tools(_)) => Err(HttpError::Internal(
            "query produced an unexpected payload".to_string(),
        )),
        Err(report) => Err(report.into()),
    }
}

pub async fn list_tools(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ToolsParams>,
) -> Result<Json<ToolsResponse>, HttpError> {
    let tools = state
        .bridge
        .spawn(OperationRequest::discover(name, params.model))
        .finish()
        .await
        .into_tools()?;

    Ok(Json(ToolsResponse {
        status: "success",
        tools,
    }))
}

/// Recover tool records from a discovery transcript captured as text.
pub async fn parse_tools(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ParseResponse>, HttpError> {
    let request: ParseRequest = parse_body(payload)?;
    let transcript = required(request.transcript, "Transcript is required")?;
    Ok(Json(ParseResponse {
        tools: state.parser.parse(&transcript),
    }))
}
