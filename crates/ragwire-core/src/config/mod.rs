//! Configuration management
//!
//! The top-level [`Config`] is loaded from YAML. Everything except the
//! `vector_store` blob is typed here; the blob is handed to
//! [`ProviderRegistry::create`](crate::providers::ProviderRegistry::create),
//! whose factories deserialize and validate their own settings.

use crate::dates::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::error::{RagError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "RAGWIRE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Orchestrator settings
    #[serde(default)]
    pub rag: RagSettings,

    /// Vector store blob; must carry a `provider` field
    #[serde(default = "default_vector_store")]
    pub vector_store: serde_json::Value,

    /// Embedding provider (optional; without it searches carry no query vector)
    #[serde(default)]
    pub embedding: Option<EmbeddingSettings>,

    /// LLM service used for query enhancement (optional)
    #[serde(default)]
    pub llm: Option<LLMServiceConfig>,

    /// Span recording
    #[serde(default)]
    pub tracing: TracingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rag: RagSettings::default(),
            vector_store: default_vector_store(),
            embedding: None,
            llm: None,
            tracing: TracingSettings::default(),
        }
    }
}

fn default_vector_store() -> serde_json::Value {
    serde_json::json!({ "provider": "simple" })
}

/// Settings read by the orchestrator on every search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Result-count limit passed to the vector store
    #[serde(
        default = "default_max_results",
        deserialize_with = "deserialize_count"
    )]
    pub max_results: usize,

    /// Metadata field holding the document date, used for newest-first ordering
    #[serde(default = "default_date_sort_field")]
    pub date_sort_field: String,

    /// Days covered by the date filter derived from a temporal anchor
    #[serde(default = "default_window_days")]
    pub date_window_days: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            date_sort_field: default_date_sort_field(),
            date_window_days: default_window_days(),
        }
    }
}

fn default_max_results() -> usize {
    20
}

fn default_date_sort_field() -> String {
    "report_generated_date".to_string()
}

fn default_window_days() -> usize {
    DEFAULT_WINDOW_DAYS
}

/// Accepts integer or floating-point counts (`20` and `20.0` alike)
fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 1.0 {
        return Err(serde::de::Error::custom(format!(
            "max_results must be a positive number, got {}",
            value
        )));
    }
    Ok(value as usize)
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name (only "voyage" today)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key; falls back to the provider's environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override for the API endpoint (testing, proxies)
    #[serde(default)]
    pub url: Option<String>,
}

fn default_embedding_provider() -> String {
    "voyage".to_string()
}

/// LLM service configuration for query enhancement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible chat completions service
    pub url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("RAGWIRE_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            model: default_chat_model(),
            api_key: std::env::var("RAGWIRE_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("RAGWIRE_LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/Llama-3.1-8B-Instruct".to_string())
}

fn default_timeout() -> u64 {
    30
}

/// Trace span recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracingSettings {
    #[serde(default)]
    pub enabled: bool,
}

impl Config {
    /// Load config from an explicit path, `RAGWIRE_CONFIG`, or the default path.
    ///
    /// A missing file at the default location yields the default config; a
    /// missing file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(RagError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_yaml_str(&std::fs::read_to_string(&path)?)?
            }
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_yaml_str(&std::fs::read_to_string(&path)?)?
                } else {
                    Config::default()
                }
            }
        };

        if config.llm.is_none() && std::env::var("RAGWIRE_LLM_URL").is_ok() {
            config.llm = Some(LLMServiceConfig::default());
        }

        Ok(config)
    }

    /// Parse config from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Name of the configured vector store provider
    pub fn vector_store_provider(&self) -> Option<&str> {
        self.vector_store.get("provider").and_then(|v| v.as_str())
    }

    fn validate(&self) -> Result<()> {
        if !self.vector_store.is_object() {
            return Err(RagError::Config(
                "vector_store must be a mapping with a provider field".to_string(),
            ));
        }
        if self.rag.date_sort_field.trim().is_empty() {
            return Err(RagError::Config(
                "rag.date_sort_field cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.rag.date_window_days) {
            return Err(RagError::Config(format!(
                "rag.date_window_days must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, self.rag.date_window_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("{}").unwrap();
        assert_eq!(config.rag.max_results, 20);
        assert_eq!(config.rag.date_window_days, 7);
        assert_eq!(config.rag.date_sort_field, "report_generated_date");
        assert_eq!(config.vector_store_provider(), Some("simple"));
        assert!(config.embedding.is_none());
        assert!(!config.tracing.enabled);
    }

    #[test]
    fn test_max_results_accepts_int_and_float() {
        let config = Config::from_yaml_str("rag:\n  max_results: 12\n").unwrap();
        assert_eq!(config.rag.max_results, 12);

        let config = Config::from_yaml_str("rag:\n  max_results: 15.0\n").unwrap();
        assert_eq!(config.rag.max_results, 15);
    }

    #[test]
    fn test_max_results_rejects_non_positive() {
        assert!(Config::from_yaml_str("rag:\n  max_results: 0\n").is_err());
        assert!(Config::from_yaml_str("rag:\n  max_results: -3\n").is_err());
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
rag:
  max_results: 10
vector_store:
  provider: s3
  bucket_name: reports
  index_name: weekly
  region: eu-west-1
  date_filter_field: report_generated_date
embedding:
  provider: voyage
  api_key: pa-test
llm:
  url: http://localhost:9000
  model: test-model
tracing:
  enabled: true
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.vector_store_provider(), Some("s3"));
        assert_eq!(config.vector_store["bucket_name"], "reports");
        assert_eq!(config.embedding.unwrap().api_key.as_deref(), Some("pa-test"));
        let llm = config.llm.unwrap();
        assert_eq!(llm.url, "http://localhost:9000");
        assert_eq!(llm.timeout_secs, 30);
        assert!(config.tracing.enabled);
    }

    #[test]
    fn test_date_window_days_bounds() {
        let config = Config::from_yaml_str("rag:\n  date_window_days: 14\n").unwrap();
        assert_eq!(config.rag.date_window_days, 14);
        assert!(Config::from_yaml_str("rag:\n  date_window_days: 366\n").is_ok());

        let err = Config::from_yaml_str("rag:\n  date_window_days: 0\n").unwrap_err();
        assert!(err.to_string().contains("date_window_days"));
        assert!(Config::from_yaml_str("rag:\n  date_window_days: 367\n").is_err());
        assert!(
            Config::from_yaml_str("rag:\n  date_window_days: 18446744073709551615\n").is_err()
        );
    }

    #[test]
    fn test_vector_store_must_be_mapping() {
        assert!(Config::from_yaml_str("vector_store: simple\n").is_err());
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "rag:\n  max_results: 5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.rag.max_results, 5);
    }
}
