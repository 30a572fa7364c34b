//! mcpcli GUI
//!
//! Iced desktop front end for managing MCP servers and running queries.

mod app;
mod form;

use anyhow::Context;
use iced::Size;
use mcpcli_core::agent::AgentRuntime;
use mcpcli_core::context::AppContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::McpGui;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpcli_gui=info,mcpcli_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let ctx = AppContext::from_env(None).context("Failed to load configuration")?;
    let runtime = AgentRuntime::from_settings(ctx.settings())?;
    let supervisor = ctx.supervisor(runtime);

    iced::application("MCP CLI - Server Manager", McpGui::update, McpGui::view)
        .subscription(McpGui::subscription)
        .exit_on_close_request(false)
        .window_size(Size::new(960.0, 640.0))
        .run_with(move || (McpGui::new(&ctx, supervisor), iced::Task::none()))?;
    Ok(())
}
