//! RAG orchestrator
//!
//! [`RagClient`] exposes three tools (`rag_search`, `rag_ingest`, `rag_stats`)
//! and runs the retrieval pipeline behind them: validate arguments, derive
//! temporal filters, embed the query, search the vector store, order the
//! hits newest first and render them as plain text for a language model.

use crate::config::{Config, RagSettings};
use crate::dates;
use crate::embedding::{create_embedding_provider, EmbeddingProvider};
use crate::enhancer::{MetadataFilters, QueryEnhancer};
use crate::error::{RagError, Result};
use crate::llm::OpenAICompatClient;
use crate::observability::{LogTracer, NoopTracer, SpanKind, TokenUsage, Tracer};
use crate::providers::{
    ProviderRegistry, SearchOptions, SearchResult, VectorProvider, VectorStoreStats,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Tool name for context retrieval
pub const TOOL_SEARCH: &str = "rag_search";
/// Tool name for file ingestion
pub const TOOL_INGEST: &str = "rag_ingest";
/// Tool name for store statistics
pub const TOOL_STATS: &str = "rag_stats";

/// Tools served by [`RagClient::call_tool`]
pub const TOOL_NAMES: [&str; 3] = [TOOL_SEARCH, TOOL_INGEST, TOOL_STATS];

/// Retrieval orchestrator
pub struct RagClient {
    provider: Arc<dyn VectorProvider>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    enhancer: Option<QueryEnhancer>,
    tracer: Arc<dyn Tracer>,
    settings: RagSettings,
}

impl RagClient {
    /// Client over `provider` with default settings and no embedder, enhancer or tracing
    pub fn new(provider: Arc<dyn VectorProvider>) -> Self {
        Self {
            provider,
            embedder: None,
            enhancer: None,
            tracer: Arc::new(NoopTracer),
            settings: RagSettings::default(),
        }
    }

    pub fn with_embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_enhancer(mut self, enhancer: QueryEnhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_settings(mut self, settings: RagSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the full pipeline from configuration and initialize the provider
    pub async fn from_config(config: &Config, registry: &ProviderRegistry) -> Result<Self> {
        let provider = registry.create(&config.vector_store)?;
        provider.initialize().await?;

        let mut client = Self::new(provider).with_settings(config.rag.clone());

        if let Some(ref embedding) = config.embedding {
            client = client.with_embedding_provider(create_embedding_provider(embedding)?);
        }

        if let Some(ref llm) = config.llm {
            let llm_client = OpenAICompatClient::new(llm.clone())?;
            client = client.with_enhancer(QueryEnhancer::new(Arc::new(llm_client)));
        }

        if config.tracing.enabled {
            client = client.with_tracer(Arc::new(LogTracer));
        }

        tracing::info!(
            provider = client.provider.provider_type(),
            embedding = client.embedder.is_some(),
            enhancer = client.enhancer.is_some(),
            tracing = config.tracing.enabled,
            "RAG client ready"
        );

        Ok(client)
    }

    /// Underlying vector provider
    pub fn provider(&self) -> &Arc<dyn VectorProvider> {
        &self.provider
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Dispatch a tool call
    pub async fn call_tool(&self, name: &str, args: &Value) -> Result<String> {
        let args = match args {
            Value::Object(map) => map,
            Value::Null => {
                return Err(RagError::InvalidInput(
                    "tool arguments are required".to_string(),
                ))
            }
            _ => {
                return Err(RagError::InvalidInput(
                    "tool arguments must be a JSON object".to_string(),
                ))
            }
        };

        match name {
            TOOL_SEARCH => self.search(args).await,
            TOOL_INGEST => self.ingest(args).await,
            TOOL_STATS => self.stats(args).await,
            other => Err(RagError::UnknownTool(other.to_string())),
        }
    }

    /// Handle `rag_search`
    pub async fn search(&self, args: &Map<String, Value>) -> Result<String> {
        let query = required_str(args, "query")?;

        let mut options = SearchOptions {
            limit: self.settings.max_results,
            ..Default::default()
        };

        let mut effective_query = query.to_string();
        let filters = match optional_value(args, "query_metadata") {
            Some(raw) => Some(serde_json::from_value::<MetadataFilters>(raw.clone()).map_err(
                |e| RagError::InvalidInput(format!("parameter query_metadata is invalid: {}", e)),
            )?),
            None => self.enhance(query, &mut effective_query).await,
        };

        if let Some(ref filters) = filters {
            if !filters.business_units.is_empty()
                || !filters.regions.is_empty()
                || !filters.labels.is_empty()
            {
                tracing::debug!(
                    business_units = ?filters.business_units,
                    regions = ?filters.regions,
                    labels = ?filters.labels,
                    "extracted filters not mapped to vector store predicates"
                );
            }
        }

        match filters.as_ref().and_then(MetadataFilters::temporal_anchor) {
            Some(anchor) => {
                match dates::expand_date_range(anchor, self.settings.date_window_days) {
                    Ok(window) => {
                        tracing::info!(
                            anchor,
                            days = self.settings.date_window_days,
                            dates = ?window,
                            "applied date filter"
                        );
                        options.date_filter = window;
                    }
                    Err(e) => {
                        tracing::warn!(anchor, error = %e, "date range expansion failed");
                    }
                }
            }
            None => tracing::debug!("no temporal anchor, searching without date filter"),
        }

        if let Some(raw) = optional_value(args, "filters") {
            options.metadata = string_map(raw, "filters")?;
        }

        if let Some(ref embedder) = self.embedder {
            options.query_vector = Some(self.embed(embedder.as_ref(), &effective_query).await?);
        }

        tracing::debug!(
            query = %effective_query,
            limit = options.limit,
            vector_dimensions = options.vector_dimensions(),
            date_filter_count = options.date_filter.len(),
            metadata_filters = options.metadata.len(),
            "searching vector store"
        );

        let mut results = self.retrieve(&effective_query, &options).await?;

        if results.is_empty() {
            return Ok(format!("No relevant context found for query: '{}'", query));
        }

        sort_by_date_desc(&mut results, &self.settings.date_sort_field);
        Ok(format_search_results(
            query,
            &results,
            &self.settings.date_sort_field,
        ))
    }

    /// Handle `rag_ingest`
    pub async fn ingest(&self, args: &Map<String, Value>) -> Result<String> {
        let file_path = required_str(args, "file_path")?;
        let metadata = match optional_value(args, "metadata") {
            Some(raw) => string_map(raw, "metadata")?,
            None => HashMap::new(),
        };

        let file_id = self.provider.ingest_file(file_path, &metadata).await?;
        Ok(format!(
            "Successfully ingested file: {} (ID: {})",
            file_path, file_id
        ))
    }

    /// Handle `rag_stats`
    pub async fn stats(&self, _args: &Map<String, Value>) -> Result<String> {
        let stats = self.provider.get_stats().await?;
        Ok(format_stats(&stats))
    }

    /// Release the provider
    pub async fn close(&self) -> Result<()> {
        self.provider.close().await
    }

    /// Run the enhancer; on success `effective_query` is replaced by the rewrite
    async fn enhance(&self, query: &str, effective_query: &mut String) -> Option<MetadataFilters> {
        let enhancer = self.enhancer.as_ref()?;

        let mut attributes = BTreeMap::new();
        attributes.insert("model".to_string(), enhancer.model_name().to_string());
        let mut span = self.tracer.start_span(
            "query-enhancement",
            SpanKind::Generation,
            query,
            attributes,
        );

        let start = Instant::now();
        let outcome = enhancer.enhance_query(query, &dates::today()).await;
        span.set_duration(start.elapsed());

        match outcome {
            Ok(enhanced) => {
                let rewritten = enhanced.enhanced_query.trim();
                if !rewritten.is_empty() {
                    *effective_query = rewritten.to_string();
                }
                span.set_output(effective_query.as_str());
                span.record_success("Query enhanced");
                span.end();
                tracing::info!(
                    original = %query,
                    enhanced = %effective_query,
                    generated_date = ?enhanced.metadata_filters.generated_date,
                    "query enhanced"
                );
                Some(enhanced.metadata_filters)
            }
            Err(e) => {
                span.record_error(&e.to_string());
                span.end();
                tracing::warn!(error = %e, "query enhancement failed, using original query");
                None
            }
        }
    }

    async fn embed(&self, embedder: &dyn EmbeddingProvider, query: &str) -> Result<Vec<f32>> {
        let mut attributes = BTreeMap::new();
        attributes.insert("model".to_string(), embedder.model_name().to_string());

        let mut span = self.tracer.start_span(
            "query-embedding-creation",
            SpanKind::Embedding,
            query,
            attributes,
        );

        let start = Instant::now();
        let outcome = embedder.embed_query(query).await;
        span.set_duration(start.elapsed());

        match outcome {
            Ok(result) => {
                span.set_token_usage(TokenUsage::input_only(result.tokens_used));
                span.set_output(&format!(
                    "Generated {}-dimensional embedding ({} tokens)",
                    result.embedding.len(),
                    result.tokens_used
                ));
                span.record_success(&format!("Embedding generated: model={}", result.model));
                span.end();
                Ok(result.embedding)
            }
            Err(e) => {
                span.record_error(&e.to_string());
                span.end();
                Err(e)
            }
        }
    }

    async fn retrieve(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "provider".to_string(),
            self.provider.provider_type().to_string(),
        );
        attributes.insert("max_results".to_string(), options.limit.to_string());
        attributes.insert(
            "has_embedding_vector".to_string(),
            (options.vector_dimensions() > 0).to_string(),
        );
        attributes.insert(
            "embedding_dimensions".to_string(),
            options.vector_dimensions().to_string(),
        );
        attributes.insert(
            "date_filter_count".to_string(),
            options.date_filter.len().to_string(),
        );

        let mut span = self
            .tracer
            .start_span("vector-search", SpanKind::Retriever, query, attributes);

        let start = Instant::now();
        let outcome = self.provider.search(query, options).await;
        let elapsed = start.elapsed();
        span.set_duration(elapsed);

        match outcome {
            Ok(results) => {
                span.set_output(&format!(
                    "Retrieved {} documents from vector store (duration: {:?})",
                    results.len(),
                    elapsed
                ));
                span.record_success(&format!(
                    "Vector search completed: {} results",
                    results.len()
                ));
                span.end();
                Ok(results)
            }
            Err(e) => {
                span.record_error(&e.to_string());
                span.end();
                Err(e)
            }
        }
    }
}

/// Required non-blank string argument
fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str> {
    match args.get(name) {
        None | Some(Value::Null) => Err(RagError::InvalidInput(format!(
            "missing required parameter: {}",
            name
        ))),
        Some(Value::String(s)) if s.trim().is_empty() => Err(RagError::InvalidInput(format!(
            "parameter {} cannot be empty",
            name
        ))),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(RagError::InvalidInput(format!(
            "parameter {} must be a string",
            name
        ))),
    }
}

/// Present, non-null argument
fn optional_value<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

/// Object argument flattened to strings
fn string_map(value: &Value, name: &str) -> Result<HashMap<String, String>> {
    let Value::Object(map) = value else {
        return Err(RagError::InvalidInput(format!(
            "parameter {} must be an object",
            name
        )));
    };

    Ok(map
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect())
}

/// Stable newest-first ordering on `metadata[date_field]`; undated results go last
pub fn sort_by_date_desc(results: &mut [SearchResult], date_field: &str) {
    results.sort_by(|a, b| {
        let date_a = a.metadata.get(date_field);
        let date_b = b.metadata.get(date_field);
        date_b.cmp(&date_a)
    });
}

/// Render search results as LLM context
pub fn format_search_results(query: &str, results: &[SearchResult], date_field: &str) -> String {
    let mut out = format!(
        "Found {} relevant context(s) for '{}':\n",
        results.len(),
        query
    );

    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("--- Context {} ---\n", i + 1));

        if !result.file_name.is_empty() {
            out.push_str(&format!("Source: {}", result.file_name));
            if result.score > 0.0 {
                out.push_str(&format!(" (score: {:.2})", result.score));
            }
            out.push('\n');
        }

        if let Some(date) = result.metadata.get(date_field) {
            out.push_str(&format!("Date: {}\n", date));
        }

        out.push_str(&format!("Content: {}\n", result.content));

        if !result.highlights.is_empty() {
            out.push_str(&format!("Highlights: {}\n", result.highlights.join(" | ")));
        }
    }

    out
}

/// Render store statistics
pub fn format_stats(stats: &VectorStoreStats) -> String {
    let mut out = String::from("RAG Vector Store Statistics:\n");
    out.push_str(&format!("Total Files: {}\n", stats.total_files));
    out.push_str(&format!("Total Chunks: {}\n", stats.total_chunks));
    out.push_str(&format!("Processing Files: {}\n", stats.processing_files));
    out.push_str(&format!("Failed Files: {}\n", stats.failed_files));

    if stats.storage_size_bytes > 0 {
        out.push_str(&format!(
            "Storage Size: {:.2} MB\n",
            stats.storage_size_bytes as f64 / (1024.0 * 1024.0)
        ));
    }

    out.push_str(&format!(
        "Last Updated: {}\n",
        stats.last_updated.format("%Y-%m-%d %H:%M:%S")
    ));
    out
}
