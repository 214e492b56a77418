//! TOML configuration for the `qamatch` binary.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use qamatch_lifecycle::LifecycleConfig;
use qamatch_matcher::MatcherConfig;

/// Environment variable consulted when the config file has no API key.
pub const API_KEY_ENV: &str = "QAMATCH_API_KEY";

/// Everything the binary needs, one table per library crate.
///
/// ```toml
/// [matcher]
/// corpus_path = "docs/QA.json"
/// threshold = 0.7
///
/// [matcher.embedding]
/// model = "BAAI/bge-m3"
///
/// [lifecycle]
/// delete_delay_secs = 600
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub matcher: MatcherConfig,
    pub lifecycle: LifecycleConfig,
}

impl AppConfig {
    /// Parse a TOML document. Missing tables and keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("invalid configuration")
    }

    /// Read `path`, or fall back to defaults when no path is given, then
    /// fill the API key from the environment if the file left it out.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml_str(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => Self::default(),
        };

        let embedding = &mut config.matcher.embedding;
        embedding.api_key =
            resolve_api_key(embedding.api_key.take(), std::env::var(API_KEY_ENV).ok());

        config.matcher.validate()?;
        Ok(config)
    }
}

/// The file's key wins; blank values count as absent.
fn resolve_api_key(from_file: Option<String>, from_env: Option<String>) -> Option<String> {
    from_file
        .filter(|key| !key.trim().is_empty())
        .or_else(|| from_env.filter(|key| !key.trim().is_empty()))
}
