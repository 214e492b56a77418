//! Similarity computation for embeddings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or either vector has zero magnitude)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

/// The best-scoring candidate of a linear scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// Position of the candidate in the scanned slice.
    pub index: usize,

    /// Cosine similarity against the query.
    pub score: f32,
}

/// Find the candidate most similar to `query`.
///
/// Every candidate is scored; on equal scores the lowest index wins.
/// A candidate whose dimension differs from the query scores 0.0.
pub fn find_best_match(query: &[f32], candidates: &[Embedding]) -> Option<ScoredMatch> {
    let mut best: Option<ScoredMatch> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let score = match cosine_similarity(query, candidate) {
            Ok(score) if score.is_finite() => score,
            Ok(_) => 0.0,
            Err(e) => {
                debug!("Scoring candidate {index} as 0.0: {e}");
                0.0
            }
        };

        match best {
            Some(current) if score <= current.score => {}
            _ => best = Some(ScoredMatch { index, score }),
        }
    }

    best
}
