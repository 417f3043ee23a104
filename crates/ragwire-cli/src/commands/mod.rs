//! CLI command handlers

pub mod ingest;
pub mod search;
pub mod stats;

use crate::app::OutputFormat;
use anyhow::Result;

/// Print tool output in the requested format
pub(crate) fn print_tool_output(tool: &str, text: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({ "tool": tool, "output": text });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Cli => print!("{}", ensure_newline(text)),
    }
    Ok(())
}

fn ensure_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}
