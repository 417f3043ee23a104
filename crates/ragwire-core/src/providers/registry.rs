//! Name-keyed factories for vector providers

use super::{S3VectorProvider, SimpleProvider, VectorProvider};
use crate::error::{RagError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Builds a provider from the `vector_store` configuration blob
pub type ProviderFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn VectorProvider>> + Send + Sync>;

/// Registry of provider factories.
///
/// Registration takes `&self`, so a shared registry can be populated from
/// several startup tasks at once.
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create new empty registry
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Create registry with the built-in backends
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("simple", |config| {
            Ok(Arc::new(SimpleProvider::from_config(config)?) as Arc<dyn VectorProvider>)
        });
        registry.register("s3", |config| {
            Ok(Arc::new(S3VectorProvider::from_config(config)?) as Arc<dyn VectorProvider>)
        });
        registry
    }

    /// Register a factory under `name`, replacing any previous one
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn VectorProvider>> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(provider = %name, "registering vector provider");
        self.factories
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name, Arc::new(factory));
    }

    /// Build the provider named by the blob's `provider` field
    pub fn create(&self, config: &serde_json::Value) -> Result<Arc<dyn VectorProvider>> {
        let name = config
            .get("provider")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RagError::Config("vector_store.provider must be a string".to_string())
            })?;

        let factory = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned();

        match factory {
            Some(factory) => factory(config),
            None => Err(RagError::UnsupportedProvider {
                name: name.to_string(),
                available: self.names().join(", "),
            }),
        }
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Whether a factory is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
