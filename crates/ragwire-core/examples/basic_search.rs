// Basic search example using ragwire as a library

use ragwire_core::{RagClient, SimpleProvider, SimpleSettings};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ragwire_core::Result<()> {
    println!("Ragwire Basic Search Example\n");

    let dir = std::env::temp_dir().join("ragwire_example");
    std::fs::create_dir_all(&dir)?;

    let reports = [
        ("weekly-2025-10-24.md", "2025-10-24", "APAC bookings rose 6%. EMEA flat."),
        ("weekly-2025-10-31.md", "2025-10-31", "APAC bookings rose 2%. Churn improved."),
    ];

    let provider = Arc::new(SimpleProvider::new(SimpleSettings {
        date_field: Some("report_generated_date".to_string()),
        ..Default::default()
    }));
    let client = RagClient::new(provider);

    for (name, date, body) in reports {
        let path = dir.join(name);
        std::fs::write(&path, body)?;
        let out = client
            .call_tool(
                "rag_ingest",
                &json!({
                    "file_path": path.to_string_lossy(),
                    "metadata": { "report_generated_date": date }
                }),
            )
            .await?;
        println!("{}", out);
    }

    println!();
    let out = client
        .call_tool(
            "rag_search",
            &json!({
                "query": "APAC bookings",
                "query_metadata": { "generated_date": "2025-10-31" }
            }),
        )
        .await?;
    println!("{}", out);

    println!("{}", client.call_tool("rag_stats", &json!({})).await?);

    client.close().await?;
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
