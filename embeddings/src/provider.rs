//! Embedding providers.
//!
//! The matcher talks to embedding services through the [`EmbeddingProvider`]
//! trait. [`HttpEmbeddingProvider`] speaks the OpenAI-compatible
//! `/v1/embeddings` protocol used by most hosted embedding services.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Trait for embedding providers.
///
/// A call is made exactly once per invocation. Implementations never retry:
/// a failure is final for that call and is returned as an error value.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// The model identifier sent with every request.
    fn model(&self) -> &str;

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Embedding provider for OpenAI-compatible HTTP endpoints.
pub struct HttpEmbeddingProvider {
    /// Bearer credential.
    api_key: Option<String>,

    /// Full URL of the embeddings endpoint.
    endpoint: String,

    /// Model identifier.
    model: String,

    /// HTTP client.
    client: reqwest::Client,
}

impl HttpEmbeddingProvider {
    /// Create a new provider for the given endpoint and model.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            endpoint: endpoint.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        debug!("Requesting embedding from {} with model: {}", self.endpoint, self.model);

        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| EmbeddingError::InvalidResponse(format!("body is not JSON: {e}")))?;

        let embedding = parse_embedding_response(&value)?;
        debug!("Received embedding with {} dimensions", embedding.len());

        Ok(embedding)
    }
}

/// Extract `data[0].embedding` from an embeddings API response.
fn parse_embedding_response(value: &Value) -> Result<Embedding> {
    let object = value.as_object().ok_or_else(|| {
        EmbeddingError::InvalidResponse("response is not a JSON object".to_string())
    })?;

    let data = object
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing `data` list".to_string()))?;

    let first = data
        .first()
        .ok_or_else(|| EmbeddingError::InvalidResponse("empty `data` list".to_string()))?;

    let raw = first
        .get("embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing `embedding` field".to_string()))?;

    if raw.is_empty() {
        return Err(EmbeddingError::InvalidResponse(
            "empty `embedding` field".to_string(),
        ));
    }

    raw.iter()
        .map(|v| {
            v.as_f64().map(|x| x as f32).ok_or_else(|| {
                EmbeddingError::InvalidResponse(format!("non-numeric embedding value: {v}"))
            })
        })
        .collect()
}
