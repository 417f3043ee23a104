//! In-process vector store
//!
//! Keeps whole files in memory and scores them by query-term overlap. It has
//! no external dependencies, which makes it the default backend for local
//! runs and tests.

use super::{
    FileInfo, FileStatus, SearchOptions, SearchResult, VectorProvider, VectorStoreStats,
};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tokio::sync::OnceCell;

const PROVIDER: &str = "simple";
const DEFAULT_LIMIT: usize = 20;
const MAX_HIGHLIGHTS: usize = 3;
const EXCERPT_LEN: usize = 500;

lazy_static! {
    static ref TERM_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
    static ref SENTENCE_RE: Regex = Regex::new(r"[^.!?\n]+").unwrap();
}

/// Typed settings for the `simple` provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleSettings {
    /// Metadata field matched against the date filter
    #[serde(default)]
    pub date_field: Option<String>,

    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for SimpleSettings {
    fn default() -> Self {
        Self {
            date_field: None,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredDocument {
    name: String,
    content: String,
    metadata: HashMap<String, String>,
    size_bytes: u64,
    created_at: DateTime<Utc>,
}

/// In-memory provider with lexical scoring
pub struct SimpleProvider {
    settings: SimpleSettings,
    documents: RwLock<HashMap<String, StoredDocument>>,
    ready: OnceCell<()>,
}

impl SimpleProvider {
    pub fn new(settings: SimpleSettings) -> Self {
        Self {
            settings,
            documents: RwLock::new(HashMap::new()),
            ready: OnceCell::new(),
        }
    }

    /// Create from the `vector_store` configuration blob
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        let mut settings: SimpleSettings = serde_json::from_value(config.clone())
            .map_err(|e| RagError::Config(format!("invalid simple provider config: {}", e)))?;
        settings.date_field = settings.date_field.filter(|f| !f.trim().is_empty());
        Ok(Self::new(settings))
    }

    pub fn settings(&self) -> &SimpleSettings {
        &self.settings
    }

    fn read_documents(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, StoredDocument>> {
        self.documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_documents(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, StoredDocument>> {
        self.documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matches_filters(&self, doc: &StoredDocument, options: &SearchOptions) -> bool {
        let metadata_ok = options
            .metadata
            .iter()
            .all(|(key, value)| doc.metadata.get(key) == Some(value));
        if !metadata_ok {
            return false;
        }

        match (self.settings.date_field.as_deref(), options.date_filter.is_empty()) {
            (Some(field), false) => doc
                .metadata
                .get(field)
                .is_some_and(|date| options.date_filter.iter().any(|d| d == date)),
            _ => true,
        }
    }
}

impl Default for SimpleProvider {
    fn default() -> Self {
        Self::new(SimpleSettings::default())
    }
}

/// Stable file id derived from the path
pub fn file_id_for_path(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    format!("file-{}", &hex[..16])
}

/// Lowercased distinct query terms
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TERM_RE
        .find_iter(query)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Fraction of distinct terms present in `content`
fn term_overlap_score(terms: &[String], content: &str) -> f32 {
    if terms.is_empty() {
        return 0.0;
    }
    let content_lower = content.to_lowercase();
    let hits = terms
        .iter()
        .filter(|t| content_lower.contains(t.as_str()))
        .count();
    hits as f32 / terms.len() as f32
}

/// Lines or sentences mentioning at least one term
fn extract_highlights(content: &str, terms: &[String]) -> Vec<String> {
    SENTENCE_RE
        .find_iter(content)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .filter(|s| {
            let lower = s.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .take(MAX_HIGHLIGHTS)
        .map(str::to_string)
        .collect()
}

/// Leading excerpt cut at a char boundary
fn excerpt(content: &str) -> String {
    if content.len() <= EXCERPT_LEN {
        return content.to_string();
    }
    let mut end = EXCERPT_LEN;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    let cut = content[..end]
        .rfind(char::is_whitespace)
        .unwrap_or(end);
    format!("{}...", content[..cut].trim_end())
}

#[async_trait]
impl VectorProvider for SimpleProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn initialize(&self) -> Result<()> {
        self.ready
            .get_or_init(|| async {
                tracing::debug!(date_field = ?self.settings.date_field, "simple provider ready");
            })
            .await;
        Ok(())
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let terms = query_terms(query);
        let limit = if options.limit == 0 {
            DEFAULT_LIMIT
        } else {
            options.limit
        };

        let mut results: Vec<SearchResult> = {
            let documents = self.read_documents();
            documents
                .iter()
                .filter(|(_, doc)| self.matches_filters(doc, options))
                .filter_map(|(id, doc)| {
                    let score = term_overlap_score(&terms, &doc.content);
                    if score <= 0.0 {
                        return None;
                    }
                    if options.min_score > 0.0 && score < options.min_score {
                        return None;
                    }
                    Some(SearchResult {
                        score,
                        file_id: id.clone(),
                        file_name: doc.name.clone(),
                        content: excerpt(&doc.content),
                        metadata: doc.metadata.clone(),
                        highlights: extract_highlights(&doc.content, &terms),
                    })
                })
                .collect()
        };

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        results.truncate(limit);

        tracing::debug!(query, results = results.len(), "simple search");
        Ok(results)
    }

    async fn ingest_file(&self, path: &str, metadata: &HashMap<String, String>) -> Result<String> {
        if path.trim().is_empty() {
            return Err(RagError::InvalidInput("file path is required".to_string()));
        }

        let file_meta = tokio::fs::metadata(path).await?;
        if !file_meta.is_file() {
            return Err(RagError::InvalidInput(format!("not a file: {}", path)));
        }
        if file_meta.len() > self.settings.max_file_bytes {
            return Err(RagError::InvalidInput(format!(
                "file {} is {} bytes, limit is {}",
                path,
                file_meta.len(),
                self.settings.max_file_bytes
            )));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let id = file_id_for_path(path);
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string());

        let doc = StoredDocument {
            name,
            size_bytes: content.len() as u64,
            content,
            metadata: metadata.clone(),
            created_at: Utc::now(),
        };

        tracing::info!(file_id = %id, path, size = doc.size_bytes, "ingested file");
        self.write_documents().insert(id.clone(), doc);
        Ok(id)
    }

    async fn ingest_files(
        &self,
        paths: &[String],
        metadata: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            ids.push(self.ingest_file(path, metadata).await?);
        }
        Ok(ids)
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        match self.write_documents().remove(file_id) {
            Some(_) => Ok(()),
            None => Err(RagError::NotFound(format!("file {}", file_id))),
        }
    }

    async fn list_files(&self, limit: usize) -> Result<Vec<FileInfo>> {
        let mut files: Vec<FileInfo> = self
            .read_documents()
            .iter()
            .map(|(id, doc)| FileInfo {
                id: id.clone(),
                name: doc.name.clone(),
                size_bytes: doc.size_bytes,
                status: FileStatus::Completed,
                created_at: doc.created_at,
                metadata: doc.metadata.clone(),
            })
            .collect();

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if limit > 0 {
            files.truncate(limit);
        }
        Ok(files)
    }

    async fn get_stats(&self) -> Result<VectorStoreStats> {
        let documents = self.read_documents();
        let count = documents.len() as u64;

        Ok(VectorStoreStats {
            total_files: count,
            total_chunks: count,
            processing_files: 0,
            failed_files: 0,
            storage_size_bytes: documents.values().map(|d| d.size_bytes).sum(),
            last_updated: documents
                .values()
                .map(|d| d.created_at)
                .max()
                .unwrap_or_else(Utc::now),
        })
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
