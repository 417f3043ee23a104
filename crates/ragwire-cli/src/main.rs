//! Ragwire CLI
//!
//! Retrieval-augmented context for LLM agents, from the terminal or over MCP.

use anyhow::Result;
use clap::Parser;
use ragwire_core::error::exit_codes;
use ragwire_core::{Config, ProviderRegistry, RagClient, RagError};
use std::sync::Arc;

mod app;
mod commands;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries tool output and MCP traffic
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        let code = e
            .downcast_ref::<RagError>()
            .map_or(exit_codes::GENERAL_ERROR, RagError::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let registry = ProviderRegistry::with_defaults();
    let client = Arc::new(RagClient::from_config(&config, &registry).await?);

    let result = match cli.command {
        Commands::Search(args) => commands::search::run(args, &client, cli.format).await,
        Commands::Ingest(args) => commands::ingest::run(args, &client, cli.format).await,
        Commands::Stats => commands::stats::run(&client, cli.format).await,
        Commands::Mcp => ragwire_mcp::start_server(client.clone()).await,
    };

    client.close().await?;
    result
}
