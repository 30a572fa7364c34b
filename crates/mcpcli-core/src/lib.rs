//! mcpcli Core Library
//!
//! Domain logic shared by the CLI, GUI and HTTP surfaces: the persisted
//! MCP server configuration, the CRUD registry over it, the bridge that runs
//! agent operations to completion from synchronous callers, and the parser
//! for tool-discovery transcripts.

pub mod agent;
pub mod bridge;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod settings;
pub mod tool_report;

pub use error::{Error, ErrorKind, Result};

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigPaths, ConfigRoot, ConfigStore, Configuration, ServerDefinition};
    pub use crate::settings::Settings;

    // Registry
    pub use crate::registry::{AddOutcome, ServerRegistry, ServerUpdate};

    // Execution
    pub use crate::bridge::{
        ErrorReport, ExecutionBridge, OperationHandle, OperationOutcome, OperationPayload,
        OperationRequest, PendingOperation, TaskSupervisor,
    };
    pub use crate::agent::AgentRuntime;

    // Tool reports
    pub use crate::tool_report::{ToolParameters, ToolRecord, ToolReportParser};

    // Context
    pub use crate::context::AppContext;

    pub use crate::error::{Error, ErrorKind};
}
