//! Error types for ragwire

use thiserror::Error;

/// Result type alias using RagError
pub type Result<T> = std::result::Result<T, RagError>;

/// Error type alias for convenience
pub type Error = RagError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for ragwire
#[derive(Debug, Error)]
pub enum RagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date '{input}': expected YYYY-MM-DD ({reason})")]
    InvalidDate { input: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported provider: {name} (registered: {available})")]
    UnsupportedProvider { name: String, available: String },

    #[error("Unknown RAG tool: {0}. Available tools: rag_search, rag_ingest, rag_stats")]
    UnknownTool(String),

    #[error("Query vector is required for the {0} provider")]
    QueryVectorRequired(String),

    #[error("{0} provider not initialized")]
    NotInitialized(String),

    #[error("{operation} is not supported by the {provider} provider")]
    Unsupported {
        provider: String,
        operation: String,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl RagError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_)
            | Self::InvalidDate { .. }
            | Self::Config(_)
            | Self::UnsupportedProvider { .. }
            | Self::UnknownTool(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
