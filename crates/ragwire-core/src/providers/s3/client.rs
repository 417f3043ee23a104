//! Index client for the S3 Vectors `QueryVectors` operation

use super::S3VectorSettings;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3vectors::error::DisplayErrorContext;
use aws_smithy_types::{Document, Number};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One `QueryVectors` call
#[derive(Debug, Clone, PartialEq)]
pub struct QueryVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub query_vector: VectorData,
    pub top_k: u32,
    pub filter: Option<serde_json::Value>,
    pub return_distance: bool,
    pub return_metadata: bool,
}

/// Query vector payload
#[derive(Debug, Clone, PartialEq)]
pub struct VectorData {
    pub float32: Vec<f32>,
}

/// `QueryVectors` result set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryVectorsResponse {
    #[serde(default)]
    pub vectors: Vec<QueryOutputVector>,
}

/// One nearest-neighbor hit
#[derive(Debug, Clone, Deserialize)]
pub struct QueryOutputVector {
    pub key: String,
    #[serde(default)]
    pub distance: Option<f32>,
    /// Opaque metadata document
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Transport for vector index queries
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    async fn query_vectors(&self, request: QueryVectorsRequest) -> Result<QueryVectorsResponse>;
}

/// Builds the index client during provider initialization
#[async_trait]
pub trait IndexClientFactory: Send + Sync {
    async fn connect(&self, settings: &S3VectorSettings) -> Result<Arc<dyn VectorIndexClient>>;
}

/// Adapts a synchronous constructor closure
pub(super) struct FnFactory<F>(pub(super) F);

#[async_trait]
impl<F> IndexClientFactory for FnFactory<F>
where
    F: Fn(&S3VectorSettings) -> Result<Arc<dyn VectorIndexClient>> + Send + Sync,
{
    async fn connect(&self, settings: &S3VectorSettings) -> Result<Arc<dyn VectorIndexClient>> {
        (self.0)(settings)
    }
}

/// Loads the default AWS credential chain for the configured region and
/// resolves credentials once so a missing chain fails initialization.
pub struct AwsIndexClientFactory;

#[async_trait]
impl IndexClientFactory for AwsIndexClientFactory {
    async fn connect(&self, settings: &S3VectorSettings) -> Result<Arc<dyn VectorIndexClient>> {
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(settings.timeout_secs))
            .build();

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;

        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            RagError::Config("no AWS credentials provider configured".to_string())
        })?;
        credentials
            .provide_credentials()
            .await
            .map_err(|e| RagError::Config(format!("failed to load AWS credentials: {}", e)))?;

        let mut builder = aws_sdk_s3vectors::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Arc::new(AwsVectorIndexClient {
            client: aws_sdk_s3vectors::Client::from_conf(builder.build()),
        }))
    }
}

/// S3 Vectors client backed by the AWS SDK
pub struct AwsVectorIndexClient {
    client: aws_sdk_s3vectors::Client,
}

#[async_trait]
impl VectorIndexClient for AwsVectorIndexClient {
    async fn query_vectors(&self, request: QueryVectorsRequest) -> Result<QueryVectorsResponse> {
        let top_k = i32::try_from(request.top_k).unwrap_or(i32::MAX);

        let output = self
            .client
            .query_vectors()
            .vector_bucket_name(request.vector_bucket_name)
            .index_name(request.index_name)
            .query_vector(aws_sdk_s3vectors::types::VectorData::Float32(
                request.query_vector.float32,
            ))
            .top_k(top_k)
            .set_filter(request.filter.map(json_to_document))
            .return_distance(request.return_distance)
            .return_metadata(request.return_metadata)
            .send()
            .await
            .map_err(|e| {
                RagError::Upstream(format!("failed to query vectors: {}", DisplayErrorContext(&e)))
            })?;

        let vectors = output
            .vectors()
            .iter()
            .map(|hit| QueryOutputVector {
                key: hit.key().to_string(),
                distance: hit.distance(),
                metadata: hit.metadata().cloned().map(document_to_json),
            })
            .collect();

        Ok(QueryVectorsResponse { vectors })
    }
}

pub(crate) fn json_to_document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Null => Document::Null,
        serde_json::Value::Bool(b) => Document::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or_default()))
            }
        }
        serde_json::Value::String(s) => Document::String(s),
        serde_json::Value::Array(items) => {
            Document::Array(items.into_iter().map(json_to_document).collect())
        }
        serde_json::Value::Object(fields) => Document::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, json_to_document(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

pub(crate) fn document_to_json(document: Document) -> serde_json::Value {
    match document {
        Document::Null => serde_json::Value::Null,
        Document::Bool(b) => serde_json::Value::Bool(b),
        Document::Number(Number::PosInt(u)) => serde_json::Value::from(u),
        Document::Number(Number::NegInt(i)) => serde_json::Value::from(i),
        // Non-finite floats have no JSON form
        Document::Number(Number::Float(f)) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Document::String(s) => serde_json::Value::String(s),
        Document::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(document_to_json).collect())
        }
        Document::Object(fields) => serde_json::Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, document_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_date_filter_converts_to_document() {
        let filter = json!({
            "report_generated_date": { "$in": ["2025-10-31", "2025-10-30"] },
            "region": "APAC"
        });

        let Document::Object(fields) = json_to_document(filter.clone()) else {
            panic!("expected object document");
        };
        assert_eq!(fields.get("region"), Some(&Document::String("APAC".to_string())));

        let Some(Document::Object(date)) = fields.get("report_generated_date") else {
            panic!("expected nested object");
        };
        assert_eq!(
            date.get("$in"),
            Some(&Document::Array(vec![
                Document::String("2025-10-31".to_string()),
                Document::String("2025-10-30".to_string()),
            ]))
        );

        assert_eq!(document_to_json(json_to_document(filter.clone())), filter);
    }

    #[test]
    fn test_metadata_numbers_keep_their_kind() {
        let metadata = json!({ "page": 3, "offset": -2, "weight": 0.5, "final": true, "note": null });
        assert_eq!(document_to_json(json_to_document(metadata.clone())), metadata);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(
            document_to_json(Document::Number(Number::Float(f64::NAN))),
            serde_json::Value::Null
        );
    }

    #[test]
    fn test_response_tolerates_missing_fields() {
        let response: QueryVectorsResponse = serde_json::from_str(
            r#"{"vectors":[{"key":"doc-1"},{"key":"doc-2","distance":0.4,"metadata":{"source_text":"x"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.vectors.len(), 2);
        assert!(response.vectors[0].distance.is_none());
        assert_eq!(response.vectors[1].distance, Some(0.4));

        let empty: QueryVectorsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.vectors.is_empty());
    }

    #[tokio::test]
    async fn test_closure_factory_connects() {
        struct Empty;

        #[async_trait]
        impl VectorIndexClient for Empty {
            async fn query_vectors(&self, _request: QueryVectorsRequest) -> Result<QueryVectorsResponse> {
                Ok(QueryVectorsResponse::default())
            }
        }

        let factory = FnFactory(|_: &S3VectorSettings| -> Result<Arc<dyn VectorIndexClient>> {
            Ok(Arc::new(Empty))
        });
        let client = factory.connect(&S3VectorSettings::new("b")).await.unwrap();
        let response = client
            .query_vectors(QueryVectorsRequest {
                vector_bucket_name: "b".to_string(),
                index_name: "default".to_string(),
                query_vector: VectorData { float32: vec![1.0] },
                top_k: 1,
                filter: None,
                return_distance: true,
                return_metadata: true,
            })
            .await
            .unwrap();
        assert!(response.vectors.is_empty());
    }
}
