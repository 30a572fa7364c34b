//! Server bootstrap - the composition root.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use mcpcli_core::agent::AgentRuntime;
use mcpcli_core::context::AppContext;
use mcpcli_core::settings::ApiSettings;

use crate::routes::create_router;
use crate::state::{ApiContext, AppState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_settings(api: &ApiSettings) -> Self {
        Self {
            host: api.host.clone(),
            port: api.port,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Wire the handler state from a context and runtime collaborators.
pub fn bootstrap(ctx: &AppContext, runtime: AgentRuntime) -> AppState {
    Arc::new(ApiContext {
        registry: ctx.registry(),
        bridge: ctx.bridge(runtime),
        parser: ctx.tool_report_parser(),
    })
}

/// Bind, then serve until the process is stopped.
pub async fn start_server(ctx: &AppContext, config: ServerConfig) -> Result<()> {
    let runtime = AgentRuntime::from_settings(ctx.settings())?;
    let app = create_router(bootstrap(ctx, runtime));

    let addr = config.address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(
        root = %ctx.root().path().display(),
        "mcp-cli API listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
