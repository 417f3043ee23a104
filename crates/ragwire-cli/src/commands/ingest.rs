//! Ingest command

use super::print_tool_output;
use crate::app::{IngestArgs, OutputFormat};
use anyhow::Result;
use ragwire_core::{RagClient, TOOL_INGEST};
use serde_json::{json, Map, Value};

pub async fn run(args: IngestArgs, client: &RagClient, format: OutputFormat) -> Result<()> {
    let metadata: Map<String, Value> = args
        .metadata
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    for path in &args.files {
        let output = client
            .call_tool(
                TOOL_INGEST,
                &json!({ "file_path": path.to_string_lossy(), "metadata": metadata }),
            )
            .await?;
        print_tool_output(TOOL_INGEST, &output, format)?;
    }

    Ok(())
}
