use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Health check.
pub async fn get() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        service: "mcp-cli-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
