//! Search command

use super::print_tool_output;
use crate::app::{OutputFormat, SearchArgs};
use anyhow::Result;
use ragwire_core::{RagClient, TOOL_INGEST, TOOL_SEARCH};
use serde_json::{json, Map, Value};

pub async fn run(args: SearchArgs, client: &RagClient, format: OutputFormat) -> Result<()> {
    for path in &args.ingest {
        client
            .call_tool(TOOL_INGEST, &json!({ "file_path": path.to_string_lossy() }))
            .await?;
    }

    let mut tool_args = Map::new();
    tool_args.insert("query".to_string(), Value::String(args.query.join(" ")));

    if let Some(date) = args.date {
        tool_args.insert(
            "query_metadata".to_string(),
            json!({ "generated_date": date }),
        );
    }

    if !args.filters.is_empty() {
        let filters: Map<String, Value> = args
            .filters
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        tool_args.insert("filters".to_string(), Value::Object(filters));
    }

    let output = client
        .call_tool(TOOL_SEARCH, &Value::Object(tool_args))
        .await?;
    print_tool_output(TOOL_SEARCH, &output, format)
}
