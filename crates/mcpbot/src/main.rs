//! mcpbot - chat with a model that can call tools on an MCP server

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::chat_command;

const USAGE: &str = "Usage: mcpbot <path_to_server> (.py, .js or executable)";

/// Chat with a model that can call tools on an MCP server
#[derive(Parser)]
#[command(name = "mcpbot")]
#[command(about = "Chat with a model that can call tools on an MCP server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to the MCP server (.py, .js or executable)
    server: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (default: ~/.mcpbot/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries the transcript
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(server) = cli.server else {
        println!("{}", USAGE);
        std::process::exit(1);
    };

    if let Err(e) = chat_command(server, cli.config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
