//! MCP tool definitions and handlers

use crate::protocol::*;
use anyhow::Result;
use ragwire_core::{RagClient, TOOL_INGEST, TOOL_SEARCH, TOOL_STATS};
use serde_json::Value;

pub fn search_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_SEARCH.to_string(),
        description: "Retrieve relevant report context from the vector store. Results are \
                      ordered newest first and include source, date, content and highlights."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language question or keywords"
                },
                "query_metadata": {
                    "type": "object",
                    "description": "Pre-extracted filters; skips LLM query enhancement when given",
                    "properties": {
                        "generated_date": {
                            "type": "string",
                            "description": "Temporal anchor (YYYY-MM-DD); searches reports from the preceding week"
                        },
                        "business_units": { "type": "array", "items": { "type": "string" } },
                        "regions": { "type": "array", "items": { "type": "string" } },
                        "labels": { "type": "array", "items": { "type": "string" } }
                    }
                },
                "filters": {
                    "type": "object",
                    "description": "Exact-match metadata filters, e.g. {\"region\": \"APAC\"}"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn ingest_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_INGEST.to_string(),
        description: "Add a local file to the vector store".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to ingest"
                },
                "metadata": {
                    "type": "object",
                    "description": "Metadata stored with the file; values are stored as strings"
                }
            },
            "required": ["file_path"]
        }),
    }
}

pub fn stats_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_STATS.to_string(),
        description: "Show vector store statistics".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// All tool definitions, in listing order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        search_tool_definition(),
        ingest_tool_definition(),
        stats_tool_definition(),
    ]
}

pub async fn handle_search(client: &RagClient, args: Value) -> Result<ToolResult> {
    let text = client.call_tool(TOOL_SEARCH, &args).await?;
    Ok(ToolResult::text(text))
}

pub async fn handle_ingest(client: &RagClient, args: Value) -> Result<ToolResult> {
    let text = client.call_tool(TOOL_INGEST, &args).await?;
    Ok(ToolResult::text(text))
}

pub async fn handle_stats(client: &RagClient, args: Value) -> Result<ToolResult> {
    let text = client.call_tool(TOOL_STATS, &args).await?;
    Ok(ToolResult::text(text))
}
