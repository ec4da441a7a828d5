//! CLI module — command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod chat;
#[cfg(feature = "server")]
pub mod serve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};

use todo_mcp::config::Config;
use todo_mcp::utils::logging::init_logging;

use chat::ProviderKind;

#[derive(Parser)]
#[command(name = "todo-mcp")]
#[command(version)]
#[command(about = "Todo list tools over MCP, with Claude and OpenAI chat clients", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.todo-mcp/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the todo tool service (MCP over SSE)
    #[cfg(feature = "server")]
    Serve {
        /// Address to bind (overrides config / HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides config / PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Todo store file
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Chat with Claude using the todo tools
    Claude(ChatArgs),
    /// Chat with an OpenAI model using the todo tools
    Openai(ChatArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ChatArgs {
    /// MCP server SSE URL (overrides config / MCP_SERVER_URL)
    #[arg(long)]
    pub url: Option<String>,
    /// Model id (overrides config)
    #[arg(long)]
    pub model: Option<String>,
    /// Query to run once; starts an interactive session when omitted
    pub query: Vec<String>,
}

/// Entry point for the CLI.
pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .with_context(|| "Failed to load configuration")?;
    init_logging(&config.logging).with_context(|| "Failed to initialize logging")?;

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        #[cfg(feature = "server")]
        Some(Commands::Serve { host, port, db }) => {
            serve::cmd_serve(config, host, port, db).await?;
        }
        Some(Commands::Claude(args)) => {
            chat::cmd_chat(config, ProviderKind::Anthropic, args).await?;
        }
        Some(Commands::Openai(args)) => {
            chat::cmd_chat(config, ProviderKind::OpenAI, args).await?;
        }
    }

    Ok(())
}
