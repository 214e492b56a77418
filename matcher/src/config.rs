//! Configuration for the matcher.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MatcherError, Result};

/// Default similarity a query must reach to be answered.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Configuration for corpus loading, embedding, and matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// JSON file holding the ordered question/answer list.
    pub corpus_path: PathBuf,

    /// Minimum cosine similarity for a match (0.0 to 1.0).
    pub threshold: f32,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,

    /// Embedding cache configuration.
    pub cache: CacheConfig,
}

impl MatcherConfig {
    /// Create a new configuration with default values.
    pub fn new(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            threshold: DEFAULT_THRESHOLD,
            embedding: EmbeddingConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache.dir = dir.into();
        self
    }

    /// Check values that would otherwise only fail at query time.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MatcherError::Config(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.embedding.endpoint.trim().is_empty() {
            return Err(MatcherError::Config("embedding endpoint is empty".to_string()));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(MatcherError::Config("embedding model is empty".to_string()));
        }
        Ok(())
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::new("docs/QA.json")
    }
}

/// Configuration for the embedding provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Full URL of the OpenAI-compatible embeddings endpoint.
    pub endpoint: String,

    /// Model identifier; also keys the cache file names.
    pub model: String,

    /// Bearer credential.
    pub api_key: Option<String>,

    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.siliconflow.cn/v1/embeddings".to_string(),
            model: "BAAI/bge-m3".to_string(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

impl fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the vector store and fingerprint sidecar.
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = MatcherConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert!(MatcherConfig::default().with_threshold(1.5).validate().is_err());
        assert!(MatcherConfig::default().with_threshold(-0.1).validate().is_err());
        assert!(MatcherConfig::default().with_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn test_empty_model_rejected() {
        let embedding = EmbeddingConfig {
            model: String::new(),
            ..EmbeddingConfig::default()
        };
        let config = MatcherConfig::default().with_embedding(embedding);
        assert!(matches!(config.validate(), Err(MatcherError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let embedding = EmbeddingConfig {
            api_key: Some("sk-secret".to_string()),
            ..EmbeddingConfig::default()
        };
        let rendered = format!("{embedding:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
