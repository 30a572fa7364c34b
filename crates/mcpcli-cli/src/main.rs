//! mcp - command-line client for Model Context Protocol servers
//!
//! Usage:
//!   mcp list                         # Show configured servers
//!   mcp add <name> <command> <args>  # Register a server
//!   mcp run <server> "<query>"       # Ask an agent backed by one server
//!   mcp tools <server>               # Discover a server's tools

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpcli_core::bridge::{ErrorReport, OperationRequest};
use mcpcli_core::context::AppContext;
use mcpcli_core::registry::{AddOutcome, ServerUpdate};
use mcpcli_core::settings::DEFAULT_MODEL;

#[derive(Parser)]
#[command(name = "mcp")]
#[command(about = "Command Line Interface for the Model Context Protocol", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration root (defaults to $MCP_CLI_ROOT, then the platform config dir)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all configured MCP servers
    List,

    /// Run a query against an MCP server
    Run {
        /// Server name to use
        server: String,
        /// Query to run
        query: String,
        #[arg(long, help = format!("OpenAI model to use (default: {DEFAULT_MODEL})"))]
        model: Option<String>,
    },

    /// Add a new MCP server
    Add {
        /// Server name
        name: String,
        /// Command to run the server (e.g., npx)
        command: String,
        /// Arguments for the command
        #[arg(required = true, allow_hyphen_values = true)]
        args: Vec<String>,
        /// Environment variable for the server process (KEY=VALUE)
        #[arg(long, value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Change fields of an existing MCP server
    Update {
        /// Server name
        name: String,
        /// Replacement command
        #[arg(long)]
        command: Option<String>,
        /// Replacement argument list (repeat for each argument)
        #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Replacement environment (KEY=VALUE, repeatable)
        #[arg(long, value_name = "KEY=VALUE")]
        env: Vec<String>,
    },

    /// Remove an MCP server
    #[command(alias = "rm")]
    Remove {
        /// Server name to remove
        name: String,
    },

    /// Export configuration to a file
    Export {
        /// File path to export to
        filepath: PathBuf,
    },

    /// Import configuration from a file
    Import {
        /// File path to import from
        filepath: PathBuf,
    },

    /// Get detailed information about a server
    Info {
        /// Server name
        server: String,
    },

    /// List tools available from a server
    Tools {
        /// Server name
        server: String,
        /// OpenAI model to use
        #[arg(long)]
        model: Option<String>,
        /// Print the discovered tools as JSON instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Parse a saved tools report into JSON
    ParseTools {
        /// Transcript file produced by `mcp tools`
        file: PathBuf,
    },
}

impl Cli {
    /// `add` takes every token after the command as a server argument, so
    /// `--env` and `--root` written after the arguments are pulled back out.
    fn lift_trailing_flags(mut self) -> Result<Self> {
        let Commands::Add { args, env, .. } = &mut self.command else {
            return Ok(self);
        };

        let mut kept = Vec::with_capacity(args.len());
        let mut tokens = std::mem::take(args).into_iter();
        while let Some(token) = tokens.next() {
            if token == "--env" || token == "--root" {
                let value = tokens
                    .next()
                    .with_context(|| format!("A value is required for '{token} <VALUE>'"))?;
                if token == "--env" {
                    env.push(value);
                } else {
                    self.root = Some(PathBuf::from(value));
                }
            } else if let Some(value) = token.strip_prefix("--env=") {
                env.push(value.to_string());
            } else if let Some(value) = token.strip_prefix("--root=") {
                self.root = Some(PathBuf::from(value));
            } else {
                kept.push(token);
            }
        }

        if kept.is_empty() {
            anyhow::bail!("At least one argument is required for the server command");
        }
        *args = kept;
        Ok(self)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let outcome = Cli::parse().lift_trailing_flags().and_then(|cli| {
        let ctx = AppContext::from_env(cli.root)?;
        run_cli(&ctx, cli.command, &mut std::io::stdout().lock())
    });

    match outcome {
        Ok(code) => code,
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &anyhow::Error) {
    match err.downcast_ref::<mcpcli_core::Error>() {
        Some(core) => {
            let report = ErrorReport::from(core);
            let mut lines = report.display_lines().into_iter();
            if let Some(first) = lines.next() {
                let message = first.strip_prefix("Error: ").unwrap_or(&first);
                eprintln!("{} {message}", style("Error:").red().bold());
            }
            for line in lines {
                eprintln!("{line}");
            }
        }
        None => eprintln!("{} {err:#}", style("Error:").red().bold()),
    }
}

fn run_cli(ctx: &AppContext, command: Commands, out: &mut impl Write) -> Result<ExitCode> {
    match command {
        Commands::List => run_list(ctx, out)?,
        Commands::Run {
            server,
            query,
            model,
        } => return run_operation(ctx, OperationRequest::query(server, query, model), out),
        Commands::Add {
            name,
            command,
            args,
            env,
        } => run_add(ctx, &name, &command, args, &env, out)?,
        Commands::Update {
            name,
            command,
            args,
            env,
        } => run_update(ctx, &name, command, args, &env, out)?,
        Commands::Remove { name } => {
            ctx.registry().remove(&name)?;
            writeln!(out, "MCP server '{name}' removed successfully.")?;
        }
        Commands::Export { filepath } => {
            ctx.registry().export_to(&filepath)?;
            writeln!(out, "Configuration exported to {}", filepath.display())?;
        }
        Commands::Import { filepath } => {
            let count = ctx.registry().import_from(&filepath)?;
            writeln!(
                out,
                "Configuration imported from {} ({count} servers)",
                filepath.display()
            )?;
        }
        Commands::Info { server } => run_info(ctx, &server, out)?,
        Commands::Tools {
            server,
            model,
            json,
        } => {
            let request = OperationRequest::discover(server, model);
            return if json {
                run_tools_json(ctx, request, out)
            } else {
                run_operation(ctx, request, out)
            };
        }
        Commands::ParseTools { file } => run_parse_tools(ctx, &file, out)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn run_list(ctx: &AppContext, out: &mut impl Write) -> Result<()> {
    let servers = ctx.registry().list()?;
    if servers.is_empty() {
        writeln!(out, "No MCP servers configured.")?;
        writeln!(
            out,
            "Use '{}' to add a new server.",
            style("mcp add <name> <command> <args...>").cyan()
        )?;
        return Ok(());
    }

    writeln!(out, "{}", style("Configured MCP servers:").bold())?;
    for (name, server) in servers {
        writeln!(out, "  - {}: {}", style(&name).green(), server.command_line())?;
    }
    Ok(())
}

fn run_add(
    ctx: &AppContext,
    name: &str,
    command: &str,
    args: Vec<String>,
    env: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let env = parse_env_pairs(env)?;
    let outcome = ctx
        .registry()
        .add(name, command, args, (!env.is_empty()).then_some(env))?;
    match outcome {
        AddOutcome::Added => writeln!(out, "MCP server '{name}' added successfully.")?,
        AddOutcome::Replaced => writeln!(
            out,
            "MCP server '{name}' added successfully (replaced the previous definition)."
        )?,
    }
    Ok(())
}

fn run_update(
    ctx: &AppContext,
    name: &str,
    command: Option<String>,
    args: Vec<String>,
    env: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let mut update = ServerUpdate::new();
    if let Some(command) = command {
        update = update.with_command(command);
    }
    if !args.is_empty() {
        update = update.with_args(args);
    }
    let env = parse_env_pairs(env)?;
    if !env.is_empty() {
        update = update.with_env(env);
    }

    ctx.registry().update(name, &update)?;
    writeln!(out, "MCP server '{name}' updated successfully.")?;
    Ok(())
}

fn run_info(ctx: &AppContext, name: &str, out: &mut impl Write) -> Result<()> {
    let server = ctx.registry().get(name)?;
    writeln!(out, "Server: {}", style(name).bold())?;
    writeln!(out, "Command: {}", server.command)?;
    writeln!(out, "Arguments: {}", server.args.join(" "))?;
    if let Some(env) = server.env.as_ref().filter(|env| !env.is_empty()) {
        writeln!(out, "Environment variables:")?;
        for (key, value) in env {
            writeln!(out, "  {key}={value}")?;
        }
    }
    Ok(())
}

/// Stream status lines while the operation runs. Failures are already part
/// of the stream, so they only affect the exit code.
fn run_operation(
    ctx: &AppContext,
    request: OperationRequest,
    out: &mut impl Write,
) -> Result<ExitCode> {
    let bridge = ctx.default_bridge()?;
    let outcome = bridge.spawn(request).wait(|line| {
        writeln!(out, "{line}").ok();
        out.flush().ok();
    });
    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_tools_json(
    ctx: &AppContext,
    request: OperationRequest,
    out: &mut impl Write,
) -> Result<ExitCode> {
    let bridge = ctx.default_bridge()?;
    let outcome = bridge.spawn(request).wait(|line| tracing::debug!("{line}"));
    match outcome.into_tools() {
        Ok(tools) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&tools)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(report) => {
            for line in report.display_lines() {
                eprintln!("{line}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_parse_tools(ctx: &AppContext, file: &Path, out: &mut impl Write) -> Result<()> {
    let transcript = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    let tools = ctx.tool_report_parser().parse(&transcript);
    writeln!(out, "{}", serde_json::to_string_pretty(&tools)?)?;
    Ok(())
}

fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                anyhow::anyhow!("Invalid environment variable '{pair}', expected KEY=VALUE")
            })?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("Invalid environment variable '{pair}', key is empty");
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}
