//! Core types for searchpipe
//!
//! This module defines the data that flows between pipeline stages:
//! heterogeneous documents, document keys, scored hits and the immutable
//! per-stage configuration.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Key
// ============================================================================

/// A document identifier extracted from the declared key field.
///
/// Keys are integers or strings. They are cheap to clone, hashable and
/// totally ordered, which is what the union/intersection merge needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// Integer identifier
    Int(i64),
    /// String identifier
    Str(String),
}

impl Key {
    /// Extract a key from a JSON field value.
    ///
    /// Integer and string values are accepted; anything else (floats,
    /// booleans, arrays, objects, null) is not a usable identifier and
    /// yields `None`.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Number(n) => n.as_i64().map(Key::Int),
            Value::String(s) => Some(Key::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

// ============================================================================
// Document
// ============================================================================

/// A caller-owned document: a mapping from field name to JSON value.
///
/// Fields need not be uniform across documents. Looking up an absent field
/// returns `None` rather than failing, so stages tolerate heterogeneous
/// schemas. Pipelines never deep-copy whole collections; they store derived
/// representations keyed by the identifier (the mapping stage, which exists
/// to resolve keys back to content, is the one exception).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set a field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field, overwriting any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field; absent fields yield `None`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Iterate over `(field, value)` pairs in field-name order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extract the identifier stored under `key_field`.
    ///
    /// Fails when the field is absent or holds a value that cannot act as
    /// an identifier (see [`Key::from_value`]).
    pub fn key(&self, key_field: &str) -> Result<Key> {
        self.fields
            .get(key_field)
            .and_then(Key::from_value)
            .ok_or_else(|| PipelineError::missing_key(key_field))
    }

    /// Join the `on` fields into a single text blob, space-separated.
    ///
    /// Absent or null fields are skipped; non-string values are rendered
    /// with their JSON representation.
    pub fn join_fields(&self, on: &[String]) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(on.len());
        for field in on {
            match self.fields.get(field.as_str()) {
                Some(Value::String(s)) => parts.push(s.clone()),
                Some(Value::Null) | None => {}
                Some(other) => parts.push(other.to_string()),
            }
        }
        parts.join(" ")
    }

    /// Merge another document's fields into this one.
    ///
    /// Later values win on field-name collision. The document key is never
    /// lost this way because hits carry their key outside the field map.
    pub fn merge_from(&mut self, other: &Document) {
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Scored keys and hits
// ============================================================================

/// A `{key, score?}` pair returned by retriever/ranker collaborators,
/// ordered by decreasing relevance within a result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKey {
    /// Document identifier
    pub key: Key,
    /// Relevance score; keyword-style retrievers emit `None`
    pub score: Option<f64>,
}

impl ScoredKey {
    /// Create a scoreless entry (match order carries the ranking)
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            score: None,
        }
    }

    /// Create a scored entry
    pub fn scored(key: impl Into<Key>, score: f64) -> Self {
        Self {
            key: key.into(),
            score: Some(score),
        }
    }
}

/// One entry of a result sequence.
///
/// Hits carry their key outside the field map, an optional "current"
/// relevance score, and whatever fields earlier stages attached. Within a
/// single result sequence keys are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    /// Document identifier
    pub key: Key,
    /// Current relevance score; the most recent scoring stage wins
    pub similarity: Option<f64>,
    /// Fields accumulated by mapping/transform stages
    pub fields: Document,
}

impl Hit {
    /// Create a bare hit carrying only a key
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            similarity: None,
            fields: Document::new(),
        }
    }

    /// Builder method: set the similarity score
    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Builder method: set the carried fields
    pub fn with_fields(mut self, fields: Document) -> Self {
        self.fields = fields;
        self
    }
}

impl From<ScoredKey> for Hit {
    fn from(scored: ScoredKey) -> Self {
        Self {
            key: scored.key,
            similarity: scored.score,
            fields: Document::new(),
        }
    }
}

// ============================================================================
// Stage configuration
// ============================================================================

/// Immutable per-stage configuration: the key field, the text fields a
/// stage operates on, and an optional result-size limit.
///
/// `k` bounds the maximum length of any result sequence the stage may
/// emit — stages truncate, never pad. `None` means unlimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    key: String,
    on: Vec<String>,
    k: Option<usize>,
}

impl StageConfig {
    /// Create a configuration with no result limit
    pub fn new(
        key: impl Into<String>,
        on: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            on: on.into_iter().map(Into::into).collect(),
            k: None,
        }
    }

    /// Builder method: bound result sequences to at most `k` entries
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }

    /// Validate the configuration.
    ///
    /// Fatal at stage construction: empty key field name, no `on` fields,
    /// or a non-positive `k`.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(PipelineError::invalid_config("key field must not be empty"));
        }
        if self.on.is_empty() {
            return Err(PipelineError::invalid_config(
                "at least one 'on' field is required",
            ));
        }
        if self.on.iter().any(String::is_empty) {
            return Err(PipelineError::invalid_config(
                "'on' field names must not be empty",
            ));
        }
        if self.k == Some(0) {
            return Err(PipelineError::invalid_config("k must be positive"));
        }
        Ok(())
    }

    /// Name of the key field
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Text fields the stage operates on
    pub fn on(&self) -> &[String] {
        &self.on
    }

    /// Result-size limit, if any
    pub fn k(&self) -> Option<usize> {
        self.k
    }

    /// Apply the `k` bound to a result sequence
    pub(crate) fn truncate(&self, hits: &mut Vec<Hit>) {
        if let Some(k) = self.k {
            hits.truncate(k);
        }
    }
}

impl fmt::Display for StageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key: {}; on: {}", self.key, self.on.join(", "))?;
        if let Some(k) = self.k {
            write!(f, "; k: {k}")?;
        }
        Ok(())
    }
}
