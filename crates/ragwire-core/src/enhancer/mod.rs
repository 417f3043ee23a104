//! LLM-driven query enhancement
//!
//! Rewrites a query for better recall and extracts structured filters
//! (business units, regions, labels and a temporal anchor). LLMs frequently
//! wrap JSON in markdown fences or add commentary, so parsing falls back to
//! fence extraction before giving up.

mod prompt;

pub use prompt::QUERY_ENHANCEMENT_PROMPT;

use crate::error::{RagError, Result};
use crate::llm::{ChatMessage, LLMClient};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Filters extracted from a query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilters {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub business_units: Vec<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub regions: Vec<String>,

    /// Temporal anchor (`YYYY-MM-DD`) for reports generated on or before it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_date: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub labels: Vec<String>,
}

impl MetadataFilters {
    /// Temporal anchor, ignoring blank values
    pub fn temporal_anchor(&self) -> Option<&str> {
        self.generated_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Result of query enhancement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedQuery {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enhanced_query: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata_filters: MetadataFilters,

    /// Never part of the LLM response; set by the enhancer
    #[serde(skip)]
    pub original_query: String,
}

/// LLMs emit `null` for fields they have nothing to say about
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Enhances queries using the primary LLM
pub struct QueryEnhancer {
    client: Arc<dyn LLMClient>,
}

impl QueryEnhancer {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Rewrite `query` and extract filters, resolving relative dates against `today`
    pub async fn enhance_query(&self, query: &str, today: &str) -> Result<EnhancedQuery> {
        let prompt = build_prompt(query, today);

        let response = self
            .client
            .chat_completion(vec![ChatMessage::user(prompt)])
            .await
            .map_err(|e| RagError::Llm(format!("failed to call LLM: {}", e)))?;

        let mut result = parse_enhancement(&response)?;
        result.original_query = query.to_string();

        tracing::debug!(
            original = %query,
            enhanced = %result.enhanced_query,
            generated_date = ?result.metadata_filters.generated_date,
            "query enhanced"
        );

        Ok(result)
    }
}

fn build_prompt(query: &str, today: &str) -> String {
    QUERY_ENHANCEMENT_PROMPT
        .replace("{today}", today)
        .replace("{query}", query)
}

fn parse_enhancement(response: &str) -> Result<EnhancedQuery> {
    if let Ok(parsed) = serde_json::from_str::<EnhancedQuery>(response) {
        return Ok(parsed);
    }

    let extracted = extract_json_from_code_block(response);
    serde_json::from_str::<EnhancedQuery>(extracted).map_err(|e| {
        RagError::Llm(format!(
            "failed to parse LLM response as JSON: {}, response: {}",
            e, extracted
        ))
    })
}

/// Extract the body of the first markdown code fence.
///
/// A ```` ```json ```` fence wins over a bare ```` ``` ```` fence. Text after the
/// closing fence is ignored. Without any fence the trimmed input is returned.
pub fn extract_json_from_code_block(text: &str) -> &str {
    let text = text.trim();

    let opening = text
        .find("```json")
        .map(|idx| (idx, "```json".len()))
        .or_else(|| text.find("```").map(|idx| (idx, "```".len())));

    let Some((start, fence_len)) = opening else {
        return text;
    };

    let body = text[start + fence_len..].trim();
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };

    body.trim()
}
