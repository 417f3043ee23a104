//! MCP server implementation

use crate::protocol::*;
use crate::tools;
use anyhow::Result;
use ragwire_core::{RagClient, TOOL_INGEST, TOOL_SEARCH, TOOL_STATS};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

pub struct McpServer {
    client: Arc<RagClient>,
}

impl McpServer {
    pub fn new(client: Arc<RagClient>) -> Self {
        Self { client }
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = BufWriter::new(tokio::io::stdout());
        self.serve(reader, writer).await
    }

    /// Serve until `reader` reaches EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(error = %e, "malformed JSON-RPC message");
                    let response =
                        JsonRpcResponse::error(None, PARSE_ERROR, &format!("Parse error: {}", e));
                    self.write_response(&mut writer, &response).await?;
                    continue;
                }
            };

            if request.is_notification() {
                tracing::debug!(method = %request.method, "notification received");
                continue;
            }

            let response = self.handle_request(&request).await;
            self.write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    async fn write_response<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        response: &JsonRpcResponse,
    ) -> Result<()> {
        let json = serde_json::to_string(response)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request).await,
            "resources/list" => self.handle_resources_list(request),
            "prompts/list" => self.handle_prompts_list(request),
            "prompts/get" => self.handle_prompts_get(request),
            _ => JsonRpcResponse::error(
                request.id.clone(),
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let result = serde_json::json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {
                "tools": {},
                "resources": { "subscribe": false },
                "prompts": {}
            },
            "serverInfo": {
                "name": "ragwire",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        JsonRpcResponse::success(request.id.clone(), result)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let tools = tools::tool_definitions();
        JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let name = request
            .params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let arguments = request
            .params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        tracing::info!(tool = name, "tool call");

        let client = self.client.as_ref();
        let result = match name {
            TOOL_SEARCH => tools::handle_search(client, arguments).await,
            TOOL_INGEST => tools::handle_ingest(client, arguments).await,
            TOOL_STATS => tools::handle_stats(client, arguments).await,
            _ => client
                .call_tool(name, &arguments)
                .await
                .map(ToolResult::text)
                .map_err(anyhow::Error::from),
        };

        let tool_result = result.unwrap_or_else(|e| {
            tracing::warn!(tool = name, error = %e, "tool call failed");
            ToolResult::error(e)
        });

        match serde_json::to_value(tool_result) {
            Ok(value) => JsonRpcResponse::success(request.id.clone(), value),
            Err(e) => JsonRpcResponse::error(request.id.clone(), INTERNAL_ERROR, &e.to_string()),
        }
    }

    fn handle_resources_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(request.id.clone(), serde_json::json!({ "resources": [] }))
    }

    fn handle_prompts_list(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let prompts = vec![serde_json::json!({
            "name": CONTEXT_PROMPT,
            "title": "Report Context Guide",
            "description": CONTEXT_PROMPT_DESCRIPTION
        })];
        JsonRpcResponse::success(
            request.id.clone(),
            serde_json::json!({ "prompts": prompts }),
        )
    }

    fn handle_prompts_get(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let name = request
            .params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        if name != CONTEXT_PROMPT {
            return JsonRpcResponse::error(
                request.id.clone(),
                INVALID_PARAMS,
                &format!("Unknown prompt: {}", name),
            );
        }

        let result = serde_json::json!({
            "description": CONTEXT_PROMPT_DESCRIPTION,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": CONTEXT_PROMPT_TEXT }
            }]
        });
        JsonRpcResponse::success(request.id.clone(), result)
    }
}

const CONTEXT_PROMPT: &str = "context";
const CONTEXT_PROMPT_DESCRIPTION: &str = "How to retrieve dated report context with rag_search";
const CONTEXT_PROMPT_TEXT: &str = "Use the rag_search tool to retrieve context from weekly reports \
before answering. Pass the user's question as `query`. When the question refers to a period \
(\"last week\", \"as of October 31\"), set `query_metadata.generated_date` to the matching \
YYYY-MM-DD date; results then cover the \
configured window (seven days by default) ending on that date. Results come newest \
first; prefer the most recent report when sources disagree and cite the Source line.";

pub async fn start_server(client: Arc<RagClient>) -> Result<()> {
    let server = McpServer::new(client);
    server.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragwire_core::SimpleProvider;
    use serde_json::{json, Value};

    fn server() -> McpServer {
        McpServer::new(Arc::new(RagClient::new(Arc::new(SimpleProvider::default()))))
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let responses = exchange(
            &server(),
            concat!(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                "\n\n",
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
                "\n"
            ),
        )
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "ragwire");
        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "rag_search");
    }

    #[tokio::test]
    async fn test_listed_prompt_can_be_fetched() {
        let responses = exchange(
            &server(),
            concat!(
                r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":2,"method":"prompts/get","params":{"name":"context"}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":3,"method":"prompts/get","params":{"name":"missing"}}"#,
                "\n"
            ),
        )
        .await;

        let listed = responses[0]["result"]["prompts"][0]["name"].as_str().unwrap();
        assert_eq!(listed, "context");

        let fetched = &responses[1]["result"];
        assert_eq!(fetched["messages"][0]["role"], "user");
        let text = fetched["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("rag_search"));
        assert!(text.contains("query_metadata.generated_date"));

        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
        assert!(responses[2]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("missing"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let responses = exchange(
            &server(),
            "not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"sampling/create\"}\n",
        )
        .await;

        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], 7);
    }

    #[tokio::test]
    async fn test_tool_errors_are_results() {
        let server = server();

        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "rag_search", "arguments": { "query": "" } }
        }))
        .unwrap();
        let response = serde_json::to_value(server.handle_request(&request).await).unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("query"));

        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": { "name": "rag_delete", "arguments": {} }
        }))
        .unwrap();
        let response = serde_json::to_value(server.handle_request(&request).await).unwrap();
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown RAG tool: rag_delete"));
    }

    #[tokio::test]
    async fn test_stats_call() {
        let request: JsonRpcRequest = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "rag_stats" }
        }))
        .unwrap();
        let response = serde_json::to_value(server().handle_request(&request).await).unwrap();
        assert!(response["result"].get("isError").is_none());
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("RAG Vector Store Statistics:\nTotal Files: 0\n"));
    }
}
