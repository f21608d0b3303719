//! Mapping stage — resolves keys back to full stored documents.
//!
//! Upstream retrievers and rankers trade in bare keys; stages that need
//! original content (ranking raw text, question answering, summarization)
//! sit behind a mapper that swaps each key for the stored document.

use crate::errors::{PipelineError, Result};
use crate::types::{Document, Hit, Key};
use indexmap::IndexMap;

/// Key → document lookup table built by `add`.
///
/// Duplicate keys overwrite. A key that cannot be resolved at query time
/// is silently dropped from the results — the defined missing-document
/// policy — never an error.
#[derive(Debug)]
pub struct Mapper {
    name: String,
    key_field: String,
    store: IndexMap<Key, Document>,
}

impl Mapper {
    /// Create an empty mapper. Fails when the key field name is empty.
    pub fn new(key_field: impl Into<String>) -> Result<Self> {
        let key_field = key_field.into();
        if key_field.is_empty() {
            return Err(PipelineError::invalid_config("key field must not be empty"));
        }
        Ok(Self {
            name: "documents".to_string(),
            key_field,
            store: IndexMap::new(),
        })
    }

    /// Create a mapper pre-loaded with a document collection
    pub fn from_documents(key_field: impl Into<String>, documents: &[Document]) -> Result<Self> {
        let mut mapper = Self::new(key_field)?;
        mapper.add(documents)?;
        Ok(mapper)
    }

    /// Builder method: set the stage name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Stage name (for logging and pipeline display)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the key field
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if nothing has been stored yet
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Ingest documents into the lookup table, overwriting on duplicate key
    pub fn add(&mut self, documents: &[Document]) -> Result<()> {
        for doc in documents {
            let key = doc.key(&self.key_field)?;
            self.store.insert(key, doc.clone());
        }
        Ok(())
    }

    /// Run the stage: replace each upstream key with the stored document's
    /// fields, preserving order and any attached similarity.
    ///
    /// Unresolvable keys are dropped. Without an upstream candidate
    /// sequence there is nothing to resolve, so the result is empty.
    pub fn run(&self, _query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        let Some(hits) = upstream else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(stored) = self.store.get(&hit.key) {
                let mut mapped = hit.clone();
                mapped.fields.merge_from(stored);
                out.push(mapped);
            }
        }
        Ok(out)
    }
}
