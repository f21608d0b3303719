//! Ranker stage — semantic re-scoring of a candidate set.
//!
//! The embedding model is an external collaborator behind the [`Encoder`]
//! trait. The stage owns an explicit [`EmbeddingCache`] of precomputed
//! document vectors and does the orchestration: encode the query, score
//! candidates by cosine similarity, sort, truncate.

use crate::errors::Result;
use crate::types::{Document, Hit, Key, StageConfig};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Encoder collaborator trait
// ============================================================================

/// External embedding model: maps text to a dense vector.
pub trait Encoder: Send + Sync {
    /// Encode one text into a vector
    fn encode(&self, text: &str) -> Result<Vec<f32>>;
}

/// Plain functions and closures are encoders.
impl<F> Encoder for F
where
    F: Fn(&str) -> Vec<f32> + Send + Sync,
{
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self(text))
    }
}

// ============================================================================
// EmbeddingCache
// ============================================================================

/// Order-preserving store of precomputed document embeddings.
///
/// The cache is an explicit handle owned by the ranker stage — never
/// process-global state. Insertion order is preserved so that ranking the
/// whole store (a ranker used as the first stage) is deterministic.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    vectors: IndexMap<Key, Vec<f32>>,
}

impl EmbeddingCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a vector, overwriting any previous entry for the key
    pub fn insert(&mut self, key: Key, vector: Vec<f32>) {
        self.vectors.insert(key, vector);
    }

    /// Look up a key's vector
    pub fn get(&self, key: &Key) -> Option<&[f32]> {
        self.vectors.get(key).map(Vec::as_slice)
    }

    /// Iterate `(key, vector)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &[f32])> {
        self.vectors.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of cached vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Cosine similarity between two vectors.
///
/// Mismatched lengths or a zero-magnitude side score 0.0 — a degenerate
/// embedding should sink in the ranking, not fail the query.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ============================================================================
// RankerStage
// ============================================================================

/// A ranker stage: an encoder collaborator plus its embedding cache.
pub struct RankerStage {
    name: String,
    config: StageConfig,
    encoder: Box<dyn Encoder>,
    cache: EmbeddingCache,
}

impl RankerStage {
    /// Create a ranker stage. Fails when the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        encoder: Box<dyn Encoder>,
        config: StageConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            encoder,
            cache: EmbeddingCache::new(),
        })
    }

    /// Stage name (for logging and pipeline display)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage configuration
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// The stage's embedding store
    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Ingest documents: encodes each document's joined `on` text into the
    /// cache, overwriting on duplicate key.
    pub fn add(&mut self, documents: &[Document]) -> Result<()> {
        for doc in documents {
            let key = doc.key(self.config.key())?;
            let vector = self.encoder.encode(&doc.join_fields(self.config.on()))?;
            self.cache.insert(key, vector);
        }
        Ok(())
    }

    /// Run the stage: score candidates against the query embedding, sort
    /// by descending similarity and truncate to `k`.
    ///
    /// Candidates come from `upstream` when present (keys without a cached
    /// embedding are dropped) or from the whole cache otherwise. The sort
    /// is stable, so ties keep candidate order. Fields attached upstream
    /// are carried forward; this stage's score becomes the current
    /// similarity.
    pub fn run(&self, query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        if self.cache.is_empty() {
            return Ok(Vec::new());
        }
        if upstream.is_some_and(<[Hit]>::is_empty) {
            return Ok(Vec::new());
        }

        let query_vector = self.encoder.encode(query)?;

        let mut scored: Vec<Hit> = match upstream {
            Some(hits) => hits
                .iter()
                .filter_map(|hit| {
                    self.cache.get(&hit.key).map(|vector| {
                        let mut next = hit.clone();
                        next.similarity = Some(cosine_similarity(&query_vector, vector));
                        next
                    })
                })
                .collect(),
            None => self
                .cache
                .iter()
                .map(|(key, vector)| {
                    Hit::new(key.clone())
                        .with_similarity(cosine_similarity(&query_vector, vector))
                })
                .collect(),
        };

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        self.config.truncate(&mut scored);
        Ok(scored)
    }
}

impl fmt::Debug for RankerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankerStage")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}
