//! # Q&A Matcher
//!
//! Matches free-text questions against a small curated Q&A corpus by
//! embedding similarity.
//!
//! ## Lifecycle
//!
//! ```text
//!  QA.json ──► Corpus ──► fingerprint ──► EmbeddingCacheStore::load
//!                                            │ hit        │ miss
//!                                            ▼            ▼
//!                                         vectors   provider.embed × N
//!                                            │            │ all ok ──► save
//!                                            ▼            ▼
//!                                     QaService (read-only, shared via Arc)
//!                                            │
//!                        query ──► embed ──► cosine scan ──► entry | none
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qamatch_matcher::{MatcherConfig, QaService};
//!
//! let service = QaService::from_config(&config, provider).await?;
//! if let Some(entry) = service.find_match("how do I reset my password").await {
//!     println!("{}", entry.answer);
//! }
//! ```

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;

pub use config::{CacheConfig, EmbeddingConfig, MatcherConfig};
pub use corpus::{Corpus, QaEntry, question_hash};
pub use engine::{EmbeddingSource, MatchResult, QaService, ServiceStats};
pub use error::{CorpusError, MatcherError, Result};

// Re-export from dependencies for convenience
pub use qamatch_embeddings::{
    Embedding, EmbeddingCacheStore, EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider,
};
