//! Vector store provider abstraction
//!
//! Every backend implements [`VectorProvider`]:
//! - `simple`: in-process store with lexical scoring, useful locally and in tests
//! - `s3`: S3 Vectors index queried with a pre-computed query vector
//!
//! Backends are constructed through a [`ProviderRegistry`] from the
//! `vector_store` configuration blob.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod registry;
pub mod s3;
pub mod simple;

pub use registry::{ProviderFactory, ProviderRegistry};
pub use s3::{S3VectorProvider, S3VectorSettings};
pub use simple::{SimpleProvider, SimpleSettings};

/// Metadata key whose value becomes [`SearchResult::content`]
pub const SOURCE_TEXT_KEY: &str = "source_text";

/// Vector store provider trait - all backends must implement this
#[async_trait::async_trait]
pub trait VectorProvider: Send + Sync {
    /// Provider type identifier (e.g., "simple", "s3")
    fn provider_type(&self) -> &'static str;

    /// Allocate clients. Runs its setup once; later calls return the cached outcome.
    async fn initialize(&self) -> Result<()>;

    /// Similarity search
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;

    /// Ingest a single file, returning its id
    async fn ingest_file(&self, path: &str, metadata: &HashMap<String, String>) -> Result<String>;

    /// Ingest several files, returning ids in input order
    async fn ingest_files(
        &self,
        paths: &[String],
        metadata: &HashMap<String, String>,
    ) -> Result<Vec<String>>;

    /// Remove a file and its vectors
    async fn delete_file(&self, file_id: &str) -> Result<()>;

    /// List stored files; `limit == 0` lists everything
    async fn list_files(&self, limit: usize) -> Result<Vec<FileInfo>>;

    /// Store statistics
    async fn get_stats(&self) -> Result<VectorStoreStats>;

    /// Release clients
    async fn close(&self) -> Result<()>;
}

/// Search options
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Metadata equality filters
    pub metadata: HashMap<String, String>,
    /// Accepted dates (`YYYY-MM-DD`), newest first
    pub date_filter: Vec<String>,
    /// Pre-computed query embedding
    pub query_vector: Option<Vec<f32>>,
    /// Minimum score; `0.0` disables the threshold
    pub min_score: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            metadata: HashMap::new(),
            date_filter: Vec::new(),
            query_vector: None,
            min_score: 0.0,
        }
    }
}

impl SearchOptions {
    /// Dimensions of the query vector (0 when absent)
    pub fn vector_dimensions(&self) -> usize {
        self.query_vector.as_ref().map_or(0, Vec::len)
    }
}

/// Search result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    /// Similarity in (0, 1], higher is closer
    pub score: f32,
    pub file_id: String,
    pub file_name: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub highlights: Vec<String>,
}

/// Processing state of a stored file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Completed,
    Processing,
    Failed,
}

/// Stored file summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub size_bytes: u64,
    pub status: FileStatus,
    pub created_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
}

/// Vector store statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorStoreStats {
    pub total_files: u64,
    pub total_chunks: u64,
    pub processing_files: u64,
    pub failed_files: u64,
    pub storage_size_bytes: u64,
    pub last_updated: DateTime<Utc>,
}

impl Default for VectorStoreStats {
    fn default() -> Self {
        Self {
            total_files: 0,
            total_chunks: 0,
            processing_files: 0,
            failed_files: 0,
            storage_size_bytes: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Convert a distance into a similarity score in (0, 1].
///
/// `None` (no distance reported) maps to `1.0`. Negative and NaN distances
/// count as zero; infinite ones as `f32::MAX`.
pub fn distance_to_score(distance: Option<f32>) -> f32 {
    match distance {
        Some(d) => {
            let d = f64::from(d.max(0.0).min(f32::MAX));
            ((1.0 / (1.0 + d)) as f32).max(f32::MIN_POSITIVE)
        }
        None => 1.0,
    }
}
