//! mcp-server - HTTP API over the MCP server configuration and agent bridge.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpcli_api::{ServerConfig, start_server};
use mcpcli_core::context::AppContext;

#[derive(Parser)]
#[command(name = "mcp-server")]
#[command(about = "MCP CLI API Server", long_about = None)]
#[command(version)]
struct Args {
    /// Host to run the server on
    #[arg(long)]
    host: Option<String>,

    /// Port to run the server on
    #[arg(long)]
    port: Option<u16>,

    /// Configuration root (defaults to $MCP_CLI_ROOT, then the platform config dir)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpcli_api=info,mcpcli_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let ctx = AppContext::from_env(args.root)?;

    let mut config = ServerConfig::from_settings(&ctx.settings().api);
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    start_server(&ctx, config).await
}
