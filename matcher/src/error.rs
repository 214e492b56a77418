//! Error types for the matcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for matcher operations.
pub type Result<T> = std::result::Result<T, MatcherError>;

/// Errors raised while loading the Q&A corpus. These are fatal at startup.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Corpus file could not be read.
    #[error("failed to read corpus {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Corpus file is not a JSON array of question/answer objects.
    #[error("failed to parse corpus {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur in the matcher.
#[derive(Error, Debug)]
pub enum MatcherError {
    /// Corpus error.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] qamatch_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
