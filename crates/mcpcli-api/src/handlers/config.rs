//! Configuration export and import.

use std::path::PathBuf;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use super::{SuccessMessage, parse_body, required, with_registry};
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FileRequest {
    pub filepath: Option<String>,
}

pub async fn export(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessMessage>, HttpError> {
    let request: FileRequest = parse_body(payload)?;
    let filepath = required(request.filepath, "File path is required")?;

    let path = PathBuf::from(&filepath);
    with_registry(&state, move |registry| registry.export_to(&path)).await?;
    Ok(SuccessMessage::new(format!("Configuration exported to {filepath}")))
}

pub async fn import(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SuccessMessage>, HttpError> {
    let request: FileRequest = parse_body(payload)?;
    let filepath = required(request.filepath, "File path is required")?;

    let path = PathBuf::from(&filepath);
    with_registry(&state, move |registry| registry.import_from(&path)).await?;
    Ok(SuccessMessage::new(format!("Configuration imported from {filepath}")))
}
