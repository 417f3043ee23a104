//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragwire")]
#[command(
    author,
    version,
    about = "Retrieval-augmented context for LLM agents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to $RAGWIRE_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Retrieve context for a query
    Search(SearchArgs),

    /// Ingest files into the vector store
    Ingest(IngestArgs),

    /// Show vector store statistics
    Stats,

    /// Start MCP server
    Mcp,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Temporal anchor (YYYY-MM-DD); skips LLM query enhancement
    #[arg(long)]
    pub date: Option<String>,

    /// Metadata equality filter, repeatable
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// Files loaded into the store before searching
    #[arg(long = "ingest", value_name = "PATH")]
    pub ingest: Vec<PathBuf>,
}

#[derive(Args)]
pub struct IngestArgs {
    /// Files to ingest
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Metadata stored with every file, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub metadata: Vec<(String, String)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
