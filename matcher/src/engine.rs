//! Q&A matching service.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use qamatch_embeddings::{
    CacheLookup, Embedding, EmbeddingCacheStore, EmbeddingProvider, find_best_match,
};

use crate::config::MatcherConfig;
use crate::corpus::{Corpus, QaEntry, question_hash};
use crate::error::{MatcherError, Result};

/// Keyword search never returns more than this many entries.
const MAX_KEYWORD_RESULTS: usize = 10;

/// How the service obtained its question embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    /// Loaded from a cache whose fingerprint matched the corpus.
    Cache,
    /// Computed through the provider and saved to the cache.
    Computed,
    /// The provider failed; the service runs with an empty corpus.
    Failed,
    /// The corpus had no entries.
    Empty,
}

/// The best-scoring entry for a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    /// Index of the entry in the corpus.
    pub index: usize,

    /// Cosine similarity between the query and the entry's question.
    pub score: f32,

    /// Whether the score reached the threshold.
    pub accepted: bool,
}

/// Statistics about the service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    /// Number of entries being served.
    pub entries: usize,

    /// Number of question embeddings held.
    pub embeddings: usize,

    /// How the embeddings were obtained.
    pub source: EmbeddingSource,
}

/// Answers free-text questions from a fixed Q&A corpus.
///
/// Built once by [`QaService::initialize`] and read-only afterwards, so it
/// can be shared behind an `Arc` without locking. `entries` and
/// `embeddings` always have equal length.
pub struct QaService {
    corpus: Corpus,
    embeddings: Vec<Embedding>,
    provider: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    source: EmbeddingSource,
}

impl QaService {
    /// Load the corpus named by `config` and initialize from its cache.
    ///
    /// A missing or malformed corpus is an error; embedding failures are not
    /// (see [`initialize`](Self::initialize)).
    pub async fn from_config(
        config: &MatcherConfig,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;

        if provider.model() != config.embedding.model {
            return Err(MatcherError::Config(format!(
                "provider model {} does not match configured model {}",
                provider.model(),
                config.embedding.model
            )));
        }

        let corpus = Corpus::load(&config.corpus_path).await?;
        let cache = EmbeddingCacheStore::new(&config.cache.dir, &config.embedding.model);

        Ok(Self::initialize(corpus, provider, &cache, config.threshold).await)
    }

    /// Attach embeddings to `corpus`, from `cache` when its fingerprint
    /// matches, otherwise by embedding every question in order.
    ///
    /// If any question fails to embed, the whole batch is abandoned: the
    /// service starts with an empty corpus, answers nothing, and nothing is
    /// written to the cache.
    pub async fn initialize(
        corpus: Corpus,
        provider: Arc<dyn EmbeddingProvider>,
        cache: &EmbeddingCacheStore,
        threshold: f32,
    ) -> Self {
        if corpus.is_empty() {
            info!("Q&A corpus is empty, nothing to embed");
            return Self::assemble(corpus, Vec::new(), provider, threshold, EmbeddingSource::Empty);
        }

        let fingerprint = corpus.fingerprint();
        debug!("Corpus fingerprint: {fingerprint}");

        match cache.load(&fingerprint).await {
            CacheLookup::Hit(vectors) if vectors.len() == corpus.len() => {
                info!("Using {} cached question embeddings", vectors.len());
                return Self::assemble(corpus, vectors, provider, threshold, EmbeddingSource::Cache);
            }
            CacheLookup::Hit(vectors) => {
                warn!(
                    "Cache holds {} vectors for {} entries, recomputing",
                    vectors.len(),
                    corpus.len()
                );
            }
            CacheLookup::Miss(reason) => {
                info!("Embedding cache miss ({reason}), computing embeddings");
            }
        }

        let mut vectors = Vec::with_capacity(corpus.len());
        for (index, entry) in corpus.entries().iter().enumerate() {
            match provider.embed(&entry.question).await {
                Ok(vector) => vectors.push(vector),
                Err(e) => {
                    warn!(
                        "Failed to embed question #{index} ({:?}): {e}; serving no answers and skipping cache save",
                        entry.question
                    );
                    return Self::assemble(
                        Corpus::default(),
                        Vec::new(),
                        provider,
                        threshold,
                        EmbeddingSource::Failed,
                    );
                }
            }
        }

        info!("Computed {} question embeddings", vectors.len());

        if let Err(e) = cache.save(&fingerprint, &vectors).await {
            warn!("Failed to save embedding cache: {e}");
        }

        Self::assemble(corpus, vectors, provider, threshold, EmbeddingSource::Computed)
    }

    fn assemble(
        corpus: Corpus,
        embeddings: Vec<Embedding>,
        provider: Arc<dyn EmbeddingProvider>,
        threshold: f32,
        source: EmbeddingSource,
    ) -> Self {
        Self {
            corpus,
            embeddings,
            provider,
            threshold,
            source,
        }
    }

    /// The corpus being served.
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Minimum similarity for a match.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score `text` against every question and report the best one,
    /// whether or not it reaches the threshold.
    ///
    /// Returns `None` when the corpus is empty or the query cannot be
    /// embedded.
    pub async fn best_match(&self, text: &str) -> Option<MatchResult> {
        if self.embeddings.is_empty() {
            return None;
        }

        let query = match self.provider.embed(text).await {
            Ok(query) => query,
            Err(e) => {
                warn!("Failed to embed query {text:?}: {e}");
                return None;
            }
        };

        let best = find_best_match(&query, &self.embeddings)?;
        let accepted = best.score >= self.threshold;

        let question = self
            .corpus
            .get(best.index)
            .map_or("", |entry| entry.question.as_str());
        if accepted {
            info!(
                "Match for {text:?}: Q#{} ({question:?}) with similarity {:.4}",
                best.index, best.score
            );
        } else {
            info!(
                "No match above threshold {:.2} for {text:?}; best was Q#{} ({question:?}) with similarity {:.4}",
                self.threshold, best.index, best.score
            );
        }

        Some(MatchResult {
            index: best.index,
            score: best.score,
            accepted,
        })
    }

    /// The entry answering `text`, if any question is similar enough.
    pub async fn find_match(&self, text: &str) -> Option<&QaEntry> {
        let result = self.best_match(text).await?;
        if result.accepted {
            self.corpus.get(result.index)
        } else {
            None
        }
    }

    /// Case-insensitive substring search over questions.
    pub fn search_by_keyword(&self, keywords: &str) -> Vec<&QaEntry> {
        let needle = keywords.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.corpus
            .entries()
            .iter()
            .filter(|entry| entry.question.to_lowercase().contains(&needle))
            .take(MAX_KEYWORD_RESULTS)
            .collect()
    }

    /// Find an entry whose question hash starts with `prefix`, returning the
    /// full hash alongside it.
    pub fn find_by_short_hash(&self, prefix: &str) -> Option<(&QaEntry, String)> {
        if prefix.is_empty() {
            return None;
        }

        self.corpus.entries().iter().find_map(|entry| {
            let full = question_hash(&entry.question);
            full.starts_with(prefix).then_some((entry, full))
        })
    }

    /// Get service statistics.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            entries: self.corpus.len(),
            embeddings: self.embeddings.len(),
            source: self.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use qamatch_embeddings::EmbeddingError;
    use tempfile::TempDir;

    /// Returns `[1, 0]` for every text.
    struct FixedProvider;

    #[async_trait]
    impl EmbeddingProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn embed(&self, _text: &str) -> qamatch_embeddings::Result<Embedding> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Fails every call.
    struct DownProvider;

    #[async_trait]
    impl EmbeddingProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        fn model(&self) -> &str {
            "down-model"
        }

        fn is_available(&self) -> bool {
            false
        }

        async fn embed(&self, _text: &str) -> qamatch_embeddings::Result<Embedding> {
            Err(EmbeddingError::ProviderNotConfigured)
        }
    }

    fn sample_corpus() -> Corpus {
        Corpus::from_entries(vec![
            QaEntry::new("How do I reset my password?", "Use the reset link."),
            QaEntry::new("Where are the logs?", "In /var/log."),
            QaEntry::new("How do I RESET the router?", "Hold the button."),
        ])
    }

    async fn service_with(provider: Arc<dyn EmbeddingProvider>) -> (QaService, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCacheStore::new(dir.path(), provider.model());
        let service = QaService::initialize(sample_corpus(), provider, &cache, 0.7).await;
        (service, dir)
    }

    #[tokio::test]
    async fn test_empty_corpus_never_calls_provider() {
        let dir = TempDir::new().unwrap();
        let cache = EmbeddingCacheStore::new(dir.path(), "down-model");
        let service =
            QaService::initialize(Corpus::default(), Arc::new(DownProvider), &cache, 0.7).await;

        assert_eq!(service.stats().source, EmbeddingSource::Empty);
        assert_eq!(service.find_match("anything").await, None);
        assert!(!cache.fingerprint_path().exists());
    }

    #[tokio::test]
    async fn test_provider_down_fails_closed() {
        let (service, _dir) = service_with(Arc::new(DownProvider)).await;

        let stats = service.stats();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.embeddings, 0);
        assert_eq!(stats.source, EmbeddingSource::Failed);
        assert_eq!(service.best_match("Where are the logs?").await, None);
    }

    #[tokio::test]
    async fn test_identical_scores_pick_first_entry() {
        let (service, _dir) = service_with(Arc::new(FixedProvider)).await;

        let result = service.best_match("anything").await.unwrap();
        assert_eq!(result.index, 0);
        assert!(result.accepted);
        assert_eq!(
            service.find_match("anything").await.map(|e| e.answer.as_str()),
            Some("Use the reset link.")
        );
    }

    #[tokio::test]
    async fn test_search_by_keyword() {
        let (service, _dir) = service_with(Arc::new(FixedProvider)).await;

        let hits: Vec<&str> = service
            .search_by_keyword("reset")
            .into_iter()
            .map(|e| e.question.as_str())
            .collect();
        assert_eq!(
            hits,
            vec!["How do I reset my password?", "How do I RESET the router?"]
        );
        assert!(service.search_by_keyword("   ").is_empty());
    }

    #[tokio::test]
    async fn test_find_by_short_hash() {
        let (service, _dir) = service_with(Arc::new(FixedProvider)).await;

        let (entry, full) = service.find_by_short_hash("b5e96206").unwrap();
        assert_eq!(entry.question, "How do I reset my password?");
        assert_eq!(full, question_hash("How do I reset my password?"));
        assert!(service.find_by_short_hash("").is_none());
    }

    #[tokio::test]
    async fn test_from_config_rejects_model_mismatch() {
        let config = MatcherConfig::default();
        let result = QaService::from_config(&config, Arc::new(FixedProvider)).await;
        assert!(matches!(result, Err(MatcherError::Config(_))));
    }
}
