//! Synchronous-to-asynchronous execution bridge.
//!
//! Every agent operation runs on its own OS thread inside a freshly built
//! current-thread runtime, so a blocking CLI call, a GUI worker and an HTTP
//! handler all see the same behavior. Callers get an [`OperationHandle`]
//! that streams status lines and resolves to an [`OperationOutcome`].

mod execution;
mod handle;
mod supervisor;

use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::tool_report::ToolRecord;

pub use execution::{CREDENTIAL_VAR, ExecutionBridge};
pub use handle::OperationHandle;
pub use supervisor::{PendingOperation, TaskSupervisor};

pub type OperationId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    RunQuery {
        server: String,
        query: String,
        model: Option<String>,
    },
    DiscoverTools {
        server: String,
        model: Option<String>,
    },
}

impl OperationRequest {
    pub fn query(server: impl Into<String>, query: impl Into<String>, model: Option<String>) -> Self {
        OperationRequest::RunQuery {
            server: server.into(),
            query: query.into(),
            model,
        }
    }

    pub fn discover(server: impl Into<String>, model: Option<String>) -> Self {
        OperationRequest::DiscoverTools {
            server: server.into(),
            model,
        }
    }

    pub fn server(&self) -> &str {
        match self {
            OperationRequest::RunQuery { server, .. }
            | OperationRequest::DiscoverTools { server, .. } => server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPayload {
    Text(String),
    Tools(Vec<ToolRecord>),
}

/// Error as seen by a surface after the operation finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_servers: Vec<String>,
}

impl ErrorReport {
    pub fn terminated() -> Self {
        Self {
            kind: ErrorKind::ExternalOperation,
            message: "operation terminated unexpectedly".to_string(),
            available_servers: Vec::new(),
        }
    }

    /// Error text as status lines, first one prefixed with `Error: `.
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Error: {}", self.message)];
        if !self.available_servers.is_empty() {
            lines.push("Available servers:".to_string());
            lines.extend(self.available_servers.iter().map(|name| format!("  - {name}")));
        }
        if self.kind == ErrorKind::MissingCredential {
            lines.push("Please set it in your .env file or as an environment variable.".to_string());
        }
        lines
    }
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            available_servers: err.available_servers().map(<[String]>::to_vec).unwrap_or_default(),
        }
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorReport {}

#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub id: OperationId,
    /// Every status line, in emission order
    pub lines: Vec<String>,
    pub result: std::result::Result<OperationPayload, ErrorReport>,
}

impl OperationOutcome {
    pub(crate) fn terminated(id: OperationId) -> Self {
        let report = ErrorReport::terminated();
        Self {
            id,
            lines: report.display_lines(),
            result: Err(report),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.result.as_ref().err()
    }

    pub fn transcript(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_text(self) -> std::result::Result<String, ErrorReport> {
        match self.result? {
            OperationPayload::Text(text) => Ok(text),
            OperationPayload::Tools(records) => Ok(serde_json::to_string_pretty(&records)
                .unwrap_or_default()),
        }
    }

    pub fn into_tools(self) -> std::result::Result<Vec<ToolRecord>, ErrorReport> {
        match self.result? {
            OperationPayload::Tools(records) => Ok(records),
            OperationPayload::Text(_) => Err(ErrorReport {
                kind: ErrorKind::Internal,
                message: "operation produced text, not tools".to_string(),
                available_servers: Vec::new(),
            }),
        }
    }
}
