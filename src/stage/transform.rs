//! Transform stage — question answering / summarization style post-processing.
//!
//! The model is an external collaborator behind the [`Transformer`] trait.
//! The stage projects each upstream hit onto the declared key and `on`
//! fields, hands those records to the collaborator, merges the derived
//! fields back onto the matching hits and re-sorts by the transform's own
//! confidence when it declares one.

use crate::errors::Result;
use crate::types::{Document, Hit, Key, StageConfig};
use rustc_hash::FxHashMap;
use std::fmt;

// ============================================================================
// Transformer collaborator trait
// ============================================================================

/// External text-transform model (extractive QA, summarization, ...).
///
/// Given the query and a batch of records, returns records carrying
/// derived fields (answer span, confidence, summary text). The key field
/// must be preserved on every returned record so the stage can merge the
/// output back onto the candidate sequence.
pub trait Transformer: Send + Sync {
    /// Derive new fields for `documents` given `query`
    fn transform(&self, query: &str, documents: &[Document]) -> Result<Vec<Document>>;

    /// Field holding this transform's confidence score.
    ///
    /// When present, the stage re-sorts its output by that field
    /// descending and it becomes the current similarity. `None` keeps
    /// the upstream order and score.
    fn score_field(&self) -> Option<&str> {
        None
    }
}

// ============================================================================
// TransformStage
// ============================================================================

/// A transform stage: a boxed collaborator plus its immutable configuration.
pub struct TransformStage {
    name: String,
    config: StageConfig,
    model: Box<dyn Transformer>,
}

impl TransformStage {
    /// Create a transform stage. Fails when the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn Transformer>,
        config: StageConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            model,
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

    /// Transforms hold no index; ingestion is a no-op.
    pub fn add(&mut self, _documents: &[Document]) -> Result<()> {
        Ok(())
    }

    /// Project a hit onto the key field plus the declared `on` fields.
    fn project(&self, hit: &Hit) -> Result<Document> {
        let mut doc = Document::new();
        doc.insert(self.config.key(), serde_json::to_value(&hit.key)?);
        for field in self.config.on() {
            if let Some(value) = hit.fields.get(field) {
                doc.insert(field.clone(), value.clone());
            }
        }
        Ok(doc)
    }

    /// Run the stage: derive fields for the upstream candidates and merge
    /// them back by key.
    ///
    /// Hits the collaborator returned no record for pass through with
    /// their existing fields. Derived records whose key does not match
    /// any candidate are ignored.
    pub fn run(&self, query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        let Some(hits) = upstream else {
            return Ok(Vec::new());
        };
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let projected: Vec<Document> = hits
            .iter()
            .map(|hit| self.project(hit))
            .collect::<Result<_>>()?;
        let derived = self.model.transform(query, &projected)?;

        let mut by_key: FxHashMap<Key, Document> = FxHashMap::default();
        for doc in derived {
            if let Ok(key) = doc.key(self.config.key()) {
                by_key.insert(key, doc);
            }
        }

        let score_field = self.model.score_field();
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let mut next = hit.clone();
            if let Some(doc) = by_key.get(&hit.key) {
                next.fields.merge_from(doc);
                if let Some(field) = score_field {
                    if let Some(score) = next.fields.get(field).and_then(|v| v.as_f64()) {
                        next.similarity = Some(score);
                    }
                }
            }
            out.push(next);
        }

        if score_field.is_some() {
            // Stable sort: candidates the model scored equally (or not at
            // all) keep their upstream order.
            out.sort_by(|a, b| {
                b.similarity
                    .partial_cmp(&a.similarity)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        self.config.truncate(&mut out);
        Ok(out)
    }
}

impl fmt::Debug for TransformStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStage")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
