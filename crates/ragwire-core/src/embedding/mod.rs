//! Query embedding providers
//!
//! The orchestrator only ever embeds queries, so the trait is deliberately
//! narrow: one text in, one vector plus usage metadata out.

mod voyage;

pub use voyage::{VoyageEmbedder, VOYAGE_API_KEY_ENV, VOYAGE_API_URL, VOYAGE_MODEL};

use crate::config::EmbeddingSettings;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Embedding of a single query
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResult {
    pub embedding: Vec<f32>,
    pub tokens_used: u32,
    pub model: String,
}

/// Turns query text into a vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a search query
    async fn embed_query(&self, text: &str) -> Result<EmbeddingResult>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Build the embedding provider named in the settings
pub fn create_embedding_provider(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "voyage" => {
            let api_key = match settings.api_key.clone() {
                Some(key) if !key.trim().is_empty() => key,
                _ => std::env::var(VOYAGE_API_KEY_ENV).map_err(|_| {
                    RagError::Config(format!(
                        "{} environment variable not set and embedding.api_key is empty",
                        VOYAGE_API_KEY_ENV
                    ))
                })?,
            };
            let mut embedder = VoyageEmbedder::new(api_key)?;
            if let Some(ref url) = settings.url {
                embedder = embedder.with_url(url.clone());
            }
            Ok(Arc::new(embedder))
        }
        other => Err(RagError::Config(format!(
            "unsupported embedding provider: {} (supported: voyage)",
            other
        ))),
    }
}
