//! # Embeddings
//!
//! This crate provides the embedding layer for the Q&A matcher.
//!
//! ## Features
//!
//! - **Embedding Generation**: Convert text to dense vectors through an
//!   OpenAI-compatible HTTP endpoint
//! - **Similarity Ranking**: Cosine similarity and best-match selection
//! - **Caching**: A fingerprint-keyed on-disk vector store so a restart with
//!   an unchanged corpus skips the provider entirely
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings Layer                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► EmbeddingCacheStore        │
//! │       │                    │              │                     │
//! │       ▼                    ▼              ▼                     │
//! │  HTTP endpoint       find_best_match   .bin + sidecar           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod provider;
pub mod similarity;

pub use cache::{CacheLookup, EmbeddingCacheStore, Fingerprint, MissReason};
pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider};
pub use similarity::{ScoredMatch, cosine_similarity, find_best_match};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
