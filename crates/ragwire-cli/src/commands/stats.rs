//! Stats command

use super::print_tool_output;
use crate::app::OutputFormat;
use anyhow::Result;
use ragwire_core::{RagClient, TOOL_STATS};

pub async fn run(client: &RagClient, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let stats = client.provider().get_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        OutputFormat::Cli => {
            let output = client.call_tool(TOOL_STATS, &serde_json::json!({})).await?;
            print_tool_output(TOOL_STATS, &output, format)
        }
    }
}
