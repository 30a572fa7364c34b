//! Server definition CRUD.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mcpcli_core::config::ServerDefinition;
use mcpcli_core::registry::ServerUpdate;

use super::{SuccessMessage, parse_body, required, with_registry};
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServerView {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ServerView {
    fn new(name: String, server: ServerDefinition) -> Self {
        Self {
            name,
            env: server.env_or_empty(),
            command: server.command,
            args: server.args,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServerList {
    pub servers: Vec<ServerView>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServerRequest {
    pub name: Option<String>,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub env: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServerRequest {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<ServerList>, HttpError> {
    let servers = with_registry(&state, |registry| registry.list())
        .await?
        .into_iter()
        .map(|(name, server)| ServerView::new(name, server))
        .collect();
    Ok(Json(ServerList { servers }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ServerView>, HttpError> {
    let lookup = name.clone();
    let server = with_registry(&state, move |registry| registry.get(&lookup)).await?;
    Ok(Json(ServerView::new(name, server)))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessMessage>, HttpError> {
    let request: CreateServerRequest = parse_body(payload)?;
    let name = required(request.name, "Server name is required")?;
    let command = required(request.command, "Command is required")?;

    let key = name.clone();
    with_registry(&state, move |registry| {
        registry.add(&key, &command, request.args, request.env)
    })
    .await?;
    Ok(SuccessMessage::new(format!("Server '{name}' added successfully")))
}

/// Merge the supplied fields into an existing server.
pub async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessMessage>, HttpError> {
    let request: UpdateServerRequest = parse_body(payload)?;

    let mut update = ServerUpdate::new();
    if let Some(command) = request.command {
        update = update.with_command(command);
    }
    if let Some(args) = request.args {
        update = update.with_args(args);
    }
    if let Some(env) = request.env {
        update = update.with_env(env);
    }

    let key = name.clone();
    with_registry(&state, move |registry| registry.update(&key, &update)).await?;
    Ok(SuccessMessage::new(format!("Server '{name}' updated successfully")))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SuccessMessage>, HttpError> {
    let key = name.clone();
    with_registry(&state, move |registry| registry.remove(&key)).await?;
    Ok(SuccessMessage::new(format!("Server '{name}' removed successfully")))
}
