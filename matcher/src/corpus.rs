//! Q&A corpus loading and fingerprinting.
//!
//! The corpus is a JSON array of `{"question": ..., "answer": ...}` objects.
//! Order matters: an entry's index is its identity and ties it to the
//! embedding at the same index.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::info;

use qamatch_embeddings::Fingerprint;

use crate::error::CorpusError;

/// A single curated question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    /// The question text that gets embedded.
    pub question: String,

    /// The answer returned on a match.
    pub answer: String,
}

impl QaEntry {
    /// Create a new entry.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// The ordered, immutable list of Q&A entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: Vec<QaEntry>,
}

impl Corpus {
    /// Build a corpus from entries already in memory.
    pub fn from_entries(entries: Vec<QaEntry>) -> Self {
        Self { entries }
    }

    /// Load the corpus from a JSON file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        info!("Loading Q&A corpus from {}", path.display());

        let content = fs::read_to_string(path)
            .await
            .map_err(|source| CorpusError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let entries: Vec<QaEntry> =
            serde_json::from_str(&content).map_err(|source| CorpusError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded {} Q&A entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// All entries in order.
    pub fn entries(&self) -> &[QaEntry] {
        &self.entries
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&QaEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 over a length-prefixed encoding of every entry in order.
    ///
    /// The encoding is the entry count, then for each entry the question and
    /// the answer, each as a little-endian `u64` byte length followed by its
    /// UTF-8 bytes. The digest depends only on content, so it is identical
    /// across runs and processes.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update((self.entries.len() as u64).to_le_bytes());
        for entry in &self.entries {
            for field in [&entry.question, &entry.answer] {
                hasher.update((field.len() as u64).to_le_bytes());
                hasher.update(field.as_bytes());
            }
        }
        Fingerprint::new(format!("{:x}", hasher.finalize()))
    }
}

/// SHA-256 hex digest of a single question, used to address entries.
pub fn question_hash(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    format!("{:x}", hasher.finalize())
}
