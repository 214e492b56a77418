//! Fingerprint-keyed embedding cache.
//!
//! The cache is two files in the cache directory, both named after the
//! embedding model so that switching models never reuses stale vectors:
//!
//! - `embeddings_cache_<model>.bin`: every question vector, in corpus order
//! - `qa_hash_<model>.txt`: the fingerprint of the corpus those vectors were
//!   computed from
//!
//! The files are written one after the other without an atomic swap. The old
//! sidecar is removed before the vectors are overwritten and the new one is
//! written last, so an interrupted save loads as a miss.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

const MAGIC: &[u8; 4] = b"QAEV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

/// Deterministic digest of a corpus, stored next to its vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-computed digest.
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// The digest as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a cache load did not produce vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No fingerprint sidecar on disk.
    NoSidecar,

    /// The sidecar belongs to different corpus content.
    FingerprintMismatch { cached: String },

    /// One of the artifacts exists but could not be read or decoded.
    Unreadable(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSidecar => write!(f, "no fingerprint sidecar"),
            Self::FingerprintMismatch { cached } => {
                write!(f, "fingerprint mismatch (cached {cached})")
            }
            Self::Unreadable(detail) => write!(f, "unreadable artifact: {detail}"),
        }
    }
}

/// Outcome of [`EmbeddingCacheStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Vectors computed from a corpus with the requested fingerprint.
    Hit(Vec<Embedding>),

    /// Nothing usable on disk; the caller recomputes.
    Miss(MissReason),
}

/// On-disk store for one model's corpus vectors.
#[derive(Debug, Clone)]
pub struct EmbeddingCacheStore {
    /// Binary vector store.
    vectors_path: PathBuf,

    /// Fingerprint sidecar.
    fingerprint_path: PathBuf,
}

impl EmbeddingCacheStore {
    /// Create a store for `model` inside `cache_dir`. Nothing is touched on
    /// disk until [`load`](Self::load) or [`save`](Self::save).
    pub fn new(cache_dir: impl AsRef<Path>, model: &str) -> Self {
        let dir = cache_dir.as_ref();
        let model = sanitize_model_name(model);
        Self {
            vectors_path: dir.join(format!("embeddings_cache_{model}.bin")),
            fingerprint_path: dir.join(format!("qa_hash_{model}.txt")),
        }
    }

    /// Path of the binary vector store.
    pub fn vectors_path(&self) -> &Path {
        &self.vectors_path
    }

    /// Path of the fingerprint sidecar.
    pub fn fingerprint_path(&self) -> &Path {
        &self.fingerprint_path
    }

    /// Load the cached vectors if they were computed for `fingerprint`.
    ///
    /// Never fails: any problem is reported as a [`CacheLookup::Miss`].
    pub async fn load(&self, fingerprint: &Fingerprint) -> CacheLookup {
        let cached = match fs::read_to_string(&self.fingerprint_path).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No fingerprint sidecar at {}", self.fingerprint_path.display());
                return CacheLookup::Miss(MissReason::NoSidecar);
            }
            Err(e) => {
                warn!("Failed to read {}: {e}", self.fingerprint_path.display());
                return CacheLookup::Miss(MissReason::Unreadable(format!(
                    "{}: {e}",
                    self.fingerprint_path.display()
                )));
            }
        };

        if cached != fingerprint.as_str() {
            info!("Corpus fingerprint changed ({cached} -> {fingerprint}), cache is stale");
            return CacheLookup::Miss(MissReason::FingerprintMismatch { cached });
        }

        let data = match fs::read(&self.vectors_path).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read {}: {e}", self.vectors_path.display());
                return CacheLookup::Miss(MissReason::Unreadable(format!(
                    "{}: {e}",
                    self.vectors_path.display()
                )));
            }
        };

        match decode_vectors(&data) {
            Ok(vectors) => {
                info!(
                    "Loaded {} cached embeddings from {}",
                    vectors.len(),
                    self.vectors_path.display()
                );
                CacheLookup::Hit(vectors)
            }
            Err(e) => {
                warn!("Discarding corrupt vector store {}: {e}", self.vectors_path.display());
                CacheLookup::Miss(MissReason::Unreadable(e.to_string()))
            }
        }
    }

    /// Persist `vectors` as the cache for `fingerprint`.
    ///
    /// Only call this with a complete set of vectors for the whole corpus.
    pub async fn save(&self, fingerprint: &Fingerprint, vectors: &[Embedding]) -> Result<()> {
        let encoded = encode_vectors(vectors)?;
        self.write_vectors(&encoded).await?;
        fs::write(&self.fingerprint_path, fingerprint.as_str()).await?;

        info!(
            "Saved {} embeddings to {}",
            vectors.len(),
            self.vectors_path.display()
        );
        Ok(())
    }

    /// Replace the vector file, dropping any sidecar first so the new
    /// vectors are never paired with an old fingerprint.
    async fn write_vectors(&self, encoded: &[u8]) -> Result<()> {
        if let Some(parent) = self.vectors_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        match fs::remove_file(&self.fingerprint_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        fs::write(&self.vectors_path, encoded).await?;
        Ok(())
    }
}

/// Turn a model identifier such as `BAAI/bge-m3` into `baai_bge_m3`.
fn sanitize_model_name(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn encode_vectors(vectors: &[Embedding]) -> Result<BytesMut> {
    let dimension = vectors.first().map_or(0, Vec::len);
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let count = u32::try_from(vectors.len())
        .map_err(|_| EmbeddingError::Cache(format!("too many vectors: {}", vectors.len())))?;
    let dim = u32::try_from(dimension)
        .map_err(|_| EmbeddingError::Cache(format!("dimension too large: {dimension}")))?;

    let mut buf = BytesMut::with_capacity(HEADER_LEN + vectors.len() * dimension * 4);
    buf.put_slice(MAGIC);
    buf.put_u32_le(FORMAT_VERSION);
    buf.put_u32_le(count);
    buf.put_u32_le(dim);
    for value in vectors.iter().flatten() {
        buf.put_f32_le(*value);
    }

    Ok(buf)
}

fn decode_vectors(data: &[u8]) -> Result<Vec<Embedding>> {
    if data.len() < HEADER_LEN {
        return Err(EmbeddingError::Cache(format!(
            "truncated header: {} bytes",
            data.len()
        )));
    }

    let mut buf = data;
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(EmbeddingError::Cache("bad magic".to_string()));
    }

    let version = buf.get_u32_le();
    if version != FORMAT_VERSION {
        return Err(EmbeddingError::Cache(format!(
            "unsupported format version {version}"
        )));
    }

    let count = buf.get_u32_le() as usize;
    let dimension = buf.get_u32_le() as usize;

    let expected = count
        .checked_mul(dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| EmbeddingError::Cache("header sizes overflow".to_string()))?;
    if buf.remaining() != expected {
        return Err(EmbeddingError::Cache(format!(
            "expected {expected} payload bytes, found {}",
            buf.remaining()
        )));
    }

    let mut vectors = Vec::with_capacity(count);
    for _ in 0..count {
        let vector: Embedding = (0..dimension).map(|_| buf.get_f32_le()).collect();
        vectors.push(vector);
    }

    Ok(vectors)
}
