//! Error responses.
//!
//! Every failure is answered as `{"error": "..."}`; unknown server names also
//! carry `available_servers`.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use mcpcli_core::bridge::ErrorReport;
use mcpcli_core::{Error as CoreError, ErrorKind};

pub const NO_DATA: &str = "No data provided";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{message}")]
    NotFound {
        message: String,
        available_servers: Option<Vec<String>>,
    },

    #[error("{0}")]
    Internal(String),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn from_kind(kind: ErrorKind, message: String, available: Option<Vec<String>>) -> Self {
        match kind {
            ErrorKind::Validation => HttpError::BadRequest(message),
            ErrorKind::NotFound => HttpError::NotFound {
                message,
                available_servers: available,
            },
            ErrorKind::MalformedConfig
            | ErrorKind::MissingCredential
            | ErrorKind::ExternalOperation
            | ErrorKind::Cancelled
            | ErrorKind::Internal => HttpError::Internal(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_servers: Option<Vec<String>>,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "{self}");
        }
        let body = match self {
            HttpError::NotFound {
                message,
                available_servers,
            } => ErrorBody {
                error: message,
                available_servers,
            },
            HttpError::BadRequest(message) | HttpError::Internal(message) => ErrorBody {
                error: message,
                available_servers: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        let available = err.available_servers().map(<[String]>::to_vec);
        HttpError::from_kind(err.kind(), err.to_string(), available)
    }
}

impl From<ErrorReport> for HttpError {
    fn from(report: ErrorReport) -> Self {
        let available = match report.kind {
            ErrorKind::NotFound if !report.available_servers.is_empty() => {
                Some(report.available_servers)
            }
            _ => None,
        };
        HttpError::from_kind(report.kind, report.message, available)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {rejection}");
        HttpError::BadRequest(NO_DATA.to_string())
    }
}
