//! S3 Vectors backend
//!
//! Searches an S3 vector index with a pre-computed query vector. The backend
//! never embeds queries itself. Ingestion, deletion, listing and statistics
//! are managed by the indexing pipeline that owns the bucket and are not
//! supported here.

mod client;

pub use client::{
    AwsIndexClientFactory, AwsVectorIndexClient, IndexClientFactory, QueryOutputVector,
    QueryVectorsRequest, QueryVectorsResponse, VectorData, VectorIndexClient,
};

use client::FnFactory;

use super::{
    distance_to_score, FileInfo, SearchOptions, SearchResult, VectorProvider, VectorStoreStats,
    SOURCE_TEXT_KEY,
};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Result cap when the caller passes no positive limit
pub const DEFAULT_TOP_K: u32 = 7;

const PROVIDER: &str = "s3";

/// Typed settings for the `s3` provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3VectorSettings {
    pub bucket_name: String,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Metadata field matched against the date filter; without it date
    /// filters are skipped
    #[serde(default)]
    pub date_filter_field: Option<String>,

    /// Endpoint override; the SDK resolves the regional endpoint otherwise
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-operation timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "default".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl S3VectorSettings {
    /// Settings with defaults for everything but the bucket
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            index_name: default_index_name(),
            region: default_region(),
            date_filter_field: None,
            endpoint: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Parse and validate from the `vector_store` blob
    pub fn from_value(config: &serde_json::Value) -> Result<Self> {
        let mut settings: Self = serde_json::from_value(config.clone())
            .map_err(|e| RagError::Config(format!("invalid s3 provider config: {}", e)))?;

        if settings.bucket_name.trim().is_empty() {
            return Err(RagError::Config(
                "bucket_name is required in s3 provider config".to_string(),
            ));
        }
        if settings.index_name.trim().is_empty() {
            settings.index_name = default_index_name();
        }
        if settings.region.trim().is_empty() {
            settings.region = default_region();
        }
        settings.date_filter_field = settings
            .date_filter_field
            .filter(|field| !field.trim().is_empty());
        settings.endpoint = settings.endpoint.filter(|url| !url.trim().is_empty());

        Ok(settings)
    }
}

/// S3 Vectors provider
pub struct S3VectorProvider {
    settings: S3VectorSettings,
    factory: Arc<dyn IndexClientFactory>,
    client: OnceCell<std::result::Result<Arc<dyn VectorIndexClient>, String>>,
}

impl S3VectorProvider {
    /// Provider using the AWS SDK and the default credential chain
    pub fn new(settings: S3VectorSettings) -> Self {
        Self::with_factory(settings, Arc::new(AwsIndexClientFactory))
    }

    /// Provider whose index client is built by `factory`
    pub fn with_factory(settings: S3VectorSettings, factory: Arc<dyn IndexClientFactory>) -> Self {
        Self {
            settings,
            factory,
            client: OnceCell::new(),
        }
    }

    /// Provider whose index client comes from a constructor closure
    pub fn with_client_factory<F>(settings: S3VectorSettings, factory: F) -> Self
    where
        F: Fn(&S3VectorSettings) -> Result<Arc<dyn VectorIndexClient>> + Send + Sync + 'static,
    {
        Self::with_factory(settings, Arc::new(FnFactory(factory)))
    }

    /// Create from the `vector_store` configuration blob
    pub fn from_config(config: &serde_json::Value) -> Result<Self> {
        Ok(Self::new(S3VectorSettings::from_value(config)?))
    }

    pub fn settings(&self) -> &S3VectorSettings {
        &self.settings
    }

    fn unsupported(operation: &str) -> RagError {
        RagError::Unsupported {
            provider: PROVIDER.to_string(),
            operation: operation.to_string(),
        }
    }
}

/// Build the filter document for a query.
///
/// Dates become `{field: {"$in": [...]}}` when a date field is configured;
/// metadata entries become plain equality predicates.
pub fn build_filter(options: &SearchOptions, date_field: Option<&str>) -> Option<serde_json::Value> {
    let mut filter = serde_json::Map::new();

    if !options.date_filter.is_empty() {
        match date_field {
            Some(field) => {
                tracing::debug!(field, dates = ?options.date_filter, "applying date filter");
                filter.insert(
                    field.to_string(),
                    serde_json::json!({ "$in": options.date_filter }),
                );
            }
            None => {
                tracing::info!(
                    provided_dates = ?options.date_filter,
                    "date filter not applied: date_filter_field not configured"
                );
            }
        }
    }

    for (key, value) in &options.metadata {
        filter.insert(key.clone(), serde_json::Value::String(value.clone()));
    }

    if filter.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(filter))
    }
}

/// Convert one hit into a result; `None` when its metadata cannot be decoded
fn decode_hit(hit: QueryOutputVector, date_field: Option<&str>) -> Option<SearchResult> {
    let score = distance_to_score(hit.distance);

    let mut result = SearchResult {
        score,
        file_id: hit.key.clone(),
        file_name: hit.key.clone(),
        ..Default::default()
    };

    let Some(document) = hit.metadata else {
        return Some(result);
    };

    let serde_json::Value::Object(fields) = document else {
        tracing::error!(
            vector_key = %hit.key,
            score,
            "failed to decode vector metadata, skipping result"
        );
        return None;
    };

    for (key, value) in fields {
        if key == SOURCE_TEXT_KEY {
            if let serde_json::Value::String(text) = value {
                result.content = text;
            }
            continue;
        }
        result.metadata.insert(key, stringify_value(value));
    }

    match date_field.and_then(|field| result.metadata.get(field)) {
        Some(date) => tracing::debug!(vector_key = %hit.key, date = %date, score, "s3 vector result"),
        None => tracing::debug!(vector_key = %hit.key, score, "s3 vector result"),
    }

    Some(result)
}

fn stringify_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorProvider for S3VectorProvider {
    fn provider_type(&self) -> &'static str {
        PROVIDER
    }

    async fn initialize(&self) -> Result<()> {
        let outcome = self
            .client
            .get_or_init(|| async {
                tracing::info!(
                    bucket = %self.settings.bucket_name,
                    index = %self.settings.index_name,
                    region = %self.settings.region,
                    "initializing s3 vectors client"
                );
                self.factory
                    .connect(&self.settings)
                    .await
                    .map_err(|e| e.to_string())
            })
            .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(message) => Err(RagError::Config(format!(
                "failed to initialize s3 vectors client: {}",
                message
            ))),
        }
    }

    async fn search(&self, _query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let client = match self.client.get() {
            Some(Ok(client)) => client.clone(),
            _ => return Err(RagError::NotInitialized(PROVIDER.to_string())),
        };

        let query_vector = match options.query_vector {
            Some(ref vector) if !vector.is_empty() => vector.clone(),
            _ => return Err(RagError::QueryVectorRequired(PROVIDER.to_string())),
        };

        let top_k = if options.limit == 0 {
            DEFAULT_TOP_K
        } else {
            u32::try_from(options.limit).unwrap_or(u32::MAX)
        };

        let date_field = self.settings.date_filter_field.as_deref();

        let request = QueryVectorsRequest {
            vector_bucket_name: self.settings.bucket_name.clone(),
            index_name: self.settings.index_name.clone(),
            query_vector: VectorData {
                float32: query_vector,
            },
            top_k,
            filter: build_filter(options, date_field),
            return_distance: true,
            return_metadata: true,
        };

        let response = client.query_vectors(request).await?;

        let results: Vec<SearchResult> = response
            .vectors
            .into_iter()
            .filter_map(|hit| decode_hit(hit, date_field))
            .filter(|r| options.min_score <= 0.0 || r.score >= options.min_score)
            .collect();

        Ok(results)
    }

    async fn ingest_file(&self, _path: &str, _metadata: &HashMap<String, String>) -> Result<String> {
        Err(Self::unsupported("ingest_file"))
    }

    async fn ingest_files(
        &self,
        _paths: &[String],
        _metadata: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        Err(Self::unsupported("ingest_files"))
    }

    async fn delete_file(&self, _file_id: &str) -> Result<()> {
        Err(Self::unsupported("delete_file"))
    }

    async fn list_files(&self, _limit: usize) -> Result<Vec<FileInfo>> {
        Err(Self::unsupported("list_files"))
    }

    async fn get_stats(&self) -> Result<VectorStoreStats> {
        Err(Self::unsupported("get_stats"))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedIndex {
        response: serde_json::Value,
        requests: Mutex<Vec<QueryVectorsRequest>>,
    }

    #[async_trait]
    impl VectorIndexClient for CannedIndex {
        async fn query_vectors(
            &self,
            request: QueryVectorsRequest,
        ) -> Result<QueryVectorsResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(serde_json::from_value(self.response.clone())?)
        }
    }

    fn provider_with(
        settings: S3VectorSettings,
        response: serde_json::Value,
    ) -> (S3VectorProvider, Arc<CannedIndex>) {
        let index = Arc::new(CannedIndex {
            response,
            requests: Mutex::new(Vec::new()),
        });
        let shared = index.clone();
        let provider = S3VectorProvider::with_client_factory(settings, move |_| {
            Ok(shared.clone() as Arc<dyn VectorIndexClient>)
        });
        (provider, index)
    }

    fn options_with_vector() -> SearchOptions {
        SearchOptions {
            query_vector: Some(vec![0.1, 0.2, 0.3]),
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_defaults_and_validation() {
        let settings = S3VectorSettings::from_value(&json!({
            "provider": "s3",
            "bucket_name": "reports",
            "date_filter_field": ""
        }))
        .unwrap();
        assert_eq!(settings.index_name, "default");
        assert_eq!(settings.region, "us-east-1");
        assert_eq!(settings.date_filter_field, None);
        assert_eq!(settings.endpoint, None);

        let settings = S3VectorSettings::from_value(&json!({
            "bucket_name": "reports",
            "endpoint": "http://localhost:4566",
            "timeout_secs": 5
        }))
        .unwrap();
        assert_eq!(settings.endpoint.as_deref(), Some("http://localhost:4566"));
        assert_eq!(settings.timeout_secs, 5);

        assert!(S3VectorSettings::from_value(&json!({ "bucket_name": "  " })).is_err());
    }

    #[test]
    fn test_build_filter_with_date_field() {
        let mut options = SearchOptions {
            date_filter: vec!["2025-10-31".to_string(), "2025-10-30".to_string()],
            ..Default::default()
        };
        options
            .metadata
            .insert("region".to_string(), "APAC".to_string());

        let filter = build_filter(&options, Some("report_generated_date")).unwrap();
        assert_eq!(
            filter,
            json!({
                "report_generated_date": { "$in": ["2025-10-31", "2025-10-30"] },
                "region": "APAC"
            })
        );
    }

    #[test]
    fn test_build_filter_skips_dates_without_field() {
        let options = SearchOptions {
            date_filter: vec!["2025-10-31".to_string()],
            ..Default::default()
        };
        assert_eq!(build_filter(&options, None), None);
    }

    #[tokio::test]
    async fn test_search_requires_initialize() {
        let (provider, _) = provider_with(S3VectorSettings::new("b"), json!({ "vectors": [] }));
        let err = provider
            .search("q", &options_with_vector())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_search_requires_query_vector() {
        let (provider, index) =
            provider_with(S3VectorSettings::new("b"), json!({ "vectors": [] }));
        provider.initialize().await.unwrap();

        let err = provider
            .search("q", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::QueryVectorRequired(_)));

        let empty = SearchOptions {
            query_vector: Some(Vec::new()),
            ..Default::default()
        };
        let err = provider.search("q", &empty).await.unwrap_err();
        assert!(matches!(err, RagError::QueryVectorRequired(_)));
        assert!(index.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_decodes_hits() {
        let mut settings = S3VectorSettings::new("reports");
        settings.date_filter_field = Some("report_generated_date".to_string());
        let (provider, index) = provider_with(
            settings,
            json!({
                "vectors": [
                    {
                        "key": "weekly-2025-10-27",
                        "distance": 1.0,
                        "metadata": {
                            "source_text": "Revenue grew 4% week over week.",
                            "report_generated_date": "2025-10-27",
                            "page": 3,
                            "final": true
                        }
                    },
                    { "key": "no-metadata" }
                ]
            }),
        );
        provider.initialize().await.unwrap();

        let mut options = options_with_vector();
        options.limit = 5;
        options.date_filter = vec!["2025-10-27".to_string()];
        let results = provider.search("revenue", &options).await.unwrap();

        assert_eq!(results.len(), 2);
        let first = &results[0];
        assert_eq!(first.file_id, "weekly-2025-10-27");
        assert_eq!(first.file_name, "weekly-2025-10-27");
        assert_eq!(first.score, 0.5);
        assert_eq!(first.content, "Revenue grew 4% week over week.");
        assert!(!first.metadata.contains_key("source_text"));
        assert_eq!(first.metadata["report_generated_date"], "2025-10-27");
        assert_eq!(first.metadata["page"], "3");
        assert_eq!(first.metadata["final"], "true");

        assert_eq!(results[1].score, 1.0);
        assert!(results[1].content.is_empty());

        let requests = index.requests.lock().unwrap();
        assert_eq!(requests[0].top_k, 5);
        assert_eq!(requests[0].vector_bucket_name, "reports");
        assert!(requests[0].return_distance && requests[0].return_metadata);
        assert_eq!(
            requests[0].filter,
            Some(json!({ "report_generated_date": { "$in": ["2025-10-27"] } }))
        );
    }

    #[tokio::test]
    async fn test_search_default_top_k() {
        let (provider, index) =
            provider_with(S3VectorSettings::new("b"), json!({ "vectors": [] }));
        provider.initialize().await.unwrap();

        let mut options = options_with_vector();
        options.limit = 0;
        provider.search("q", &options).await.unwrap();
        assert_eq!(index.requests.lock().unwrap()[0].top_k, DEFAULT_TOP_K);
    }

    #[tokio::test]
    async fn test_undecodable_hit_is_skipped() {
        let (provider, _) = provider_with(
            S3VectorSettings::new("b"),
            json!({
                "vectors": [
                    { "key": "broken", "distance": 0.1, "metadata": "not-a-document" },
                    { "key": "good", "distance": 0.2, "metadata": { "source_text": "ok" } }
                ]
            }),
        );
        provider.initialize().await.unwrap();

        let results = provider.search("q", &options_with_vector()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_id, "good");
    }

    #[tokio::test]
    async fn test_min_score_filter() {
        let (provider, _) = provider_with(
            S3VectorSettings::new("b"),
            json!({
                "vectors": [
                    { "key": "close", "distance": 0.25 },
                    { "key": "far", "distance": 9.0 }
                ]
            }),
        );
        provider.initialize().await.unwrap();

        let mut options = options_with_vector();
        options.min_score = 0.5;
        let results = provider.search("q", &options).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].file_id, "close");
    }

    #[tokio::test]
    async fn test_initialize_runs_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = Arc::new(S3VectorProvider::with_client_factory(
            S3VectorSettings::new("b"),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(CannedIndex {
                    response: json!({ "vectors": [] }),
                    requests: Mutex::new(Vec::new()),
                }) as Arc<dyn VectorIndexClient>)
            },
        ));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let provider = provider.clone();
                tokio::spawn(async move { provider.initialize().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let provider = S3VectorProvider::with_client_factory(S3VectorSettings::new("b"), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(RagError::Config("no credentials".to_string()))
        });

        let first = provider.initialize().await.unwrap_err();
        let second = provider.initialize().await.unwrap_err();
        assert!(first.to_string().contains("no credentials"));
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = provider
            .search("q", &options_with_vector())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::NotInitialized(_)));
    }

    struct MissingCredentials {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IndexClientFactory for MissingCredentials {
        async fn connect(
            &self,
            _settings: &S3VectorSettings,
        ) -> Result<Arc<dyn VectorIndexClient>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Err(RagError::Config(
                "failed to load AWS credentials: no providers in chain".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn test_credential_failure_surfaces_from_initialize() {
        let factory = Arc::new(MissingCredentials {
            calls: AtomicUsize::new(0),
        });
        let provider = S3VectorProvider::with_factory(S3VectorSettings::new("b"), factory.clone());

        for _ in 0..3 {
            let err = provider.initialize().await.unwrap_err();
            assert!(matches!(err, RagError::Config(_)));
            assert!(err
                .to_string()
                .contains("failed to initialize s3 vectors client: failed to load AWS credentials"));
        }
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_management_operations_unsupported() {
        let provider = S3VectorProvider::new(S3VectorSettings::new("b"));
        assert!(matches!(
            provider.ingest_file("a.txt", &HashMap::new()).await,
            Err(RagError::Unsupported { .. })
        ));
        assert!(matches!(
            provider.get_stats().await,
            Err(RagError::Unsupported { .. })
        ));
        assert!(provider.close().await.is_ok());
    }
}
