//! HTTP handlers.

pub mod config;
pub mod operations;
pub mod servers;
pub mod status;

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use mcpcli_core::registry::ServerRegistry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HttpError, NO_DATA};
use crate::state::AppState;

/// Decode a JSON body. Absent, invalid, `null` and `{}` bodies all count as
/// no data.
pub(crate) fn parse_body<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, HttpError> {
    let Json(value) = payload?;
    let empty = match &value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(HttpError::BadRequest(NO_DATA.to_string()));
    }
    serde_json::from_value(value)
        .map_err(|e| HttpError::BadRequest(format!("Invalid request body: {e}")))
}

/// Non-blank string field, or a validation error naming it.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, HttpError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest(message.to_string()))
}

/// Run a registry call on the blocking pool; it reads and writes the
/// configuration file synchronously.
pub(crate) async fn with_registry<T, F>(state: &AppState, f: F) -> Result<T, HttpError>
where
    F: FnOnce(&ServerRegistry) -> mcpcli_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.registry))
        .await
        .map_err(|e| HttpError::Internal(format!("registry task failed: {e}")))?
        .map_err(HttpError::from)
}

#[derive(Debug, Serialize)]
pub struct SuccessMessage {
    pub status: &'static str,
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "success",
            message: message.into(),
        })
    }
}
