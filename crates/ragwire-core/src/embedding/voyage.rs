//! Voyage AI contextualized embeddings client

use super::{EmbeddingProvider, EmbeddingResult};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Contextualized embeddings endpoint
pub const VOYAGE_API_URL: &str = "https://api.voyageai.com/v1/contextualizedembeddings";

/// Model used for every request
pub const VOYAGE_MODEL: &str = "voyage-context-3";

/// Environment variable holding the API key
pub const VOYAGE_API_KEY_ENV: &str = "VOYAGE_API_KEY";

/// Upper bound for a single request, regardless of the caller's deadline
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body. `inputs` is a list of lists: outer = batch, inner = context.
#[derive(Debug, Serialize)]
struct ContextualEmbedRequest<'a> {
    inputs: Vec<Vec<&'a str>>,
    input_type: &'static str,
    model: &'static str,
}

#[derive(Debug, Deserialize)]
struct ContextualEmbedResponse {
    data: Vec<DataItem>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct DataItem {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

/// Embedder backed by Voyage's contextualized embeddings API
pub struct VoyageEmbedder {
    http_client: reqwest::Client,
    api_key: String,
    url: String,
}

impl VoyageEmbedder {
    /// Create a client with the fixed request timeout
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            url: VOYAGE_API_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for VoyageEmbedder {
    async fn embed_query(&self, text: &str) -> Result<EmbeddingResult> {
        let request = ContextualEmbedRequest {
            inputs: vec![vec![text]],
            input_type: "query",
            model: VOYAGE_MODEL,
        };

        tracing::debug!(url = %self.url, chars = text.len(), "requesting query embedding");

        let response = self
            .http_client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RagError::Upstream(format!(
                "voyage API returned status {}: {}",
                status.as_u16(),
                body
            )));
        }

        parse_response(&body)
    }

    fn model_name(&self) -> &str {
        VOYAGE_MODEL
    }
}

/// Pull `data[0].data[0].embedding` out of a response body
fn parse_response(body: &str) -> Result<EmbeddingResult> {
    let response: ContextualEmbedResponse = serde_json::from_str(body)
        .map_err(|e| RagError::Upstream(format!("failed to decode embedding response: {}", e)))?;

    let group = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Upstream("empty data array in response".to_string()))?;

    let item = group
        .data
        .into_iter()
        .next()
        .ok_or_else(|| RagError::Upstream("empty embedding data in response".to_string()))?;

    if item.embedding.is_empty() {
        return Err(RagError::Upstream("empty embedding vector".to_string()));
    }

    Ok(EmbeddingResult {
        embedding: item.embedding,
        tokens_used: response.usage.total_tokens,
        model: response.model.unwrap_or_else(|| VOYAGE_MODEL.to_string()),
    })
}
