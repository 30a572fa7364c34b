//! Shared application state type.

use std::sync::Arc;

use mcpcli_core::bridge::ExecutionBridge;
use mcpcli_core::registry::ServerRegistry;
use mcpcli_core::tool_report::ToolReportParser;

/// Services needed by the API handlers.
pub struct ApiContext {
    pub registry: ServerRegistry,
    pub bridge: ExecutionBridge,
    pub parser: ToolReportParser,
}

/// Application state shared across all handlers.
pub type AppState = Arc<ApiContext>;
