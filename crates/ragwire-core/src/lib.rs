//! Ragwire Core Library
//!
//! Retrieval-augmented generation client for LLM agents.
//!
//! # Features
//! - Pluggable vector stores behind a name-keyed provider registry
//! - S3 Vectors backend with metadata and date-window filters
//! - Voyage AI query embeddings
//! - LLM query enhancement with temporal anchor extraction
//! - Newest-first context rendering for `rag_search`, `rag_ingest`, `rag_stats`

pub mod client;
pub mod config;
pub mod dates;
pub mod embedding;
pub mod enhancer;
pub mod error;
pub mod llm;
pub mod observability;
pub mod providers;

pub use client::{RagClient, TOOL_INGEST, TOOL_NAMES, TOOL_SEARCH, TOOL_STATS};
pub use config::{Config, EmbeddingSettings, LLMServiceConfig, RagSettings, TracingSettings};
pub use embedding::{create_embedding_provider, EmbeddingProvider, EmbeddingResult, VoyageEmbedder};
pub use enhancer::{EnhancedQuery, MetadataFilters, QueryEnhancer};
pub use error::{Error, RagError, Result};
pub use llm::{ChatMessage, LLMClient, OpenAICompatClient};
pub use observability::{LogTracer, NoopTracer, Span, SpanKind, TokenUsage, Tracer};
pub use providers::{
    FileInfo, FileStatus, ProviderRegistry, S3VectorProvider, S3VectorSettings, SearchOptions,
    SearchResult, SimpleProvider, SimpleSettings, VectorProvider, VectorStoreStats,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "ragwire";
