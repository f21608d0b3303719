//! Retriever stage — initial candidate generation from a query.
//!
//! The scoring algorithm lives behind the [`Retriever`] trait: the stage
//! only handles document ingestion (building `(key, text)` pairs from the
//! configured `on` fields), candidate restriction and the `k` bound.

use crate::errors::Result;
use crate::types::{Document, Hit, Key, ScoredKey, StageConfig};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

// ============================================================================
// Retriever collaborator trait
// ============================================================================

/// External retrieval collaborator: a scoring oracle over indexed text.
///
/// Implementations own whatever lexical index they need (TF-IDF, BM25, an
/// external full-text service). The composition layer never inspects that
/// state; it only feeds `(key, text)` pairs in and reads ranked keys out.
pub trait Retriever: Send + Sync {
    /// Index `(key, text)` pairs. Re-indexing an existing key overwrites
    /// the previous entry.
    fn index(&mut self, entries: &[(Key, String)]) -> Result<()>;

    /// Ranked keys for `query`, best first, at most `limit` entries.
    ///
    /// An unknown or empty query yields an empty list, never an error.
    fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<ScoredKey>>;

    /// Like [`Retriever::search`] but restricted to `candidates`.
    ///
    /// The default implementation runs an unrestricted search and filters,
    /// preserving the original ranking. Implementations backed by an index
    /// that supports key filters can override this.
    fn search_within(
        &self,
        query: &str,
        candidates: &FxHashSet<Key>,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredKey>> {
        let mut ranked: Vec<ScoredKey> = self
            .search(query, None)?
            .into_iter()
            .filter(|scored| candidates.contains(&scored.key))
            .collect();
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        Ok(ranked)
    }
}

// ============================================================================
// RetrieverStage
// ============================================================================

/// A retriever stage: a boxed collaborator plus its immutable configuration.
pub struct RetrieverStage {
    name: String,
    config: StageConfig,
    model: Box<dyn Retriever>,
}

impl RetrieverStage {
    /// Create a retriever stage. Fails when the configuration is invalid.
    pub fn new(
        name: impl Into<String>,
        model: Box<dyn Retriever>,
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

    /// Ingest documents: extracts each document's key and joined `on` text
    /// and hands them to the collaborator's index.
    pub fn add(&mut self, documents: &[Document]) -> Result<()> {
        let mut entries = Vec::with_capacity(documents.len());
        for doc in documents {
            let key = doc.key(self.config.key())?;
            entries.push((key, doc.join_fields(self.config.on())));
        }
        self.model.index(&entries)
    }

    /// Run the stage: unrestricted search, or a re-ranking of the upstream
    /// candidate keys when `upstream` is present.
    ///
    /// Fields already attached to surviving upstream hits are carried
    /// forward; a score from this stage replaces the previous similarity,
    /// while a scoreless result keeps it.
    pub fn run(&self, query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        let ranked = match upstream {
            Some(hits) => {
                if hits.is_empty() {
                    return Ok(Vec::new());
                }
                let candidates: FxHashSet<Key> = hits.iter().map(|h| h.key.clone()).collect();
                self.model
                    .search_within(query, &candidates, self.config.k())?
            }
            None => self.model.search(query, self.config.k())?,
        };

        let prior: FxHashMap<&Key, &Hit> = upstream
            .unwrap_or_default()
            .iter()
            .map(|h| (&h.key, h))
            .collect();

        let mut out = Vec::with_capacity(ranked.len());
        let mut seen: FxHashSet<Key> = FxHashSet::default();
        for scored in ranked {
            // Keys are unique within one result sequence.
            if !seen.insert(scored.key.clone()) {
                continue;
            }
            let mut hit = match prior.get(&scored.key) {
                Some(previous) => (*previous).clone(),
                None => Hit::new(scored.key.clone()),
            };
            hit.key = scored.key;
            hit.similarity = scored.score.or(hit.similarity);
            out.push(hit);
        }

        // Enforce the bound even if the collaborator ignored `limit`.
        self.config.truncate(&mut out);
        Ok(out)
    }
}

impl fmt::Debug for RetrieverStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrieverStage")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// KeywordRetriever — built-in scoreless retriever
// ============================================================================

/// Scoreless keyword retriever over lowercased unicode-word token sets.
///
/// A document matches when any query token appears in its indexed text.
/// Matches keep document insertion order and carry no score — this is the
/// "string retriever without scores" whose ranking is its match order.
/// There is deliberately no relevance math here; plug a scoring oracle in
/// through [`Retriever`] for ranked retrieval.
#[derive(Debug, Default)]
pub struct KeywordRetriever {
    docs: IndexMap<Key, FxHashSet<String>>,
}

impl KeywordRetriever {
    /// Create an empty keyword retriever
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if nothing has been indexed yet
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn tokenize(text: &str) -> FxHashSet<String> {
        text.unicode_words().map(str::to_lowercase).collect()
    }
}

impl Retriever for KeywordRetriever {
    fn index(&mut self, entries: &[(Key, String)]) -> Result<()> {
        for (key, text) in entries {
            // Overwrite on duplicate key: re-adding refreshes the tokens.
            self.docs.insert(key.clone(), Self::tokenize(text));
        }
        Ok(())
    }

    fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<ScoredKey>> {
        let terms = Self::tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for (key, tokens) in &self.docs {
            if terms.iter().any(|term| tokens.contains(term)) {
                out.push(ScoredKey::new(key.clone()));
                if limit.is_some_and(|limit| out.len() >= limit) {
                    break;
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64, article: &str) -> Document {
        Document::new().with_field("id", id).with_field("article", article)
    }

    fn keyword_stage(k: Option<usize>) -> RetrieverStage {
        let mut config = StageConfig::new("id", ["article"]);
        if let Some(k) = k {
            config = config.with_k(k);
        }
        RetrieverStage::new("keyword", Box::new(KeywordRetriever::new()), config).unwrap()
    }

    #[test]
    fn test_keyword_retriever_match_order() {
        let mut retriever = KeywordRetriever::new();
        retriever
            .index(&[
                (Key::Int(0), "Paris is a city".to_string()),
                (Key::Int(1), "Lyon is a city".to_string()),
                (Key::Int(2), "Berlin is a city".to_string()),
            ])
            .unwrap();

        let hits = retriever.search("city", None).unwrap();
        let keys: Vec<&Key> = hits.iter().map(|s| &s.key).collect();
        assert_eq!(keys, vec![&Key::Int(0), &Key::Int(1), &Key::Int(2)]);
        assert!(hits.iter().all(|s| s.score.is_none()));

        let hits = retriever.search("lyon", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, Key::Int(1));
    }

    #[test]
    fn test_keyword_retriever_limit_and_overwrite() {
        let mut retriever = KeywordRetriever::new();
        retriever
            .index(&[
                (Key::Int(0), "rust search".to_string()),
                (Key::Int(1), "rust pipelines".to_string()),
            ])
            .unwrap();

        assert_eq!(retriever.search("rust", Some(1)).unwrap().len(), 1);

        // Re-indexing key 0 replaces its tokens instead of appending.
        retriever
            .index(&[(Key::Int(0), "haskell search".to_string())])
            .unwrap();
        assert_eq!(retriever.len(), 2);
        let hits = retriever.search("rust", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, Key::Int(1));
    }

    #[test]
    fn test_empty_and_unknown_queries_are_empty_not_errors() {
        let retriever = KeywordRetriever::new();
        assert!(retriever.search("anything", None).unwrap().is_empty());

        let mut retriever = KeywordRetriever::new();
        retriever
            .index(&[(Key::Int(0), "Paris".to_string())])
            .unwrap();
        assert!(retriever.search("", None).unwrap().is_empty());
        assert!(retriever.search("zurich", None).unwrap().is_empty());
    }

    #[test]
    fn test_stage_add_requires_key_field() {
        let mut stage = keyword_stage(None);
        let missing = Document::new().with_field("article", "no id here");
        assert!(stage.add(&[missing]).is_err());
    }

    #[test]
    fn test_stage_run_truncates_to_k() {
        let mut stage = keyword_stage(Some(2));
        stage
            .add(&[
                doc(0, "city of lights"),
                doc(1, "city of love"),
                doc(2, "city of bridges"),
            ])
            .unwrap();

        let hits = stage.run("city", None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, Key::Int(0));
        assert_eq!(hits[1].key, Key::Int(1));
    }

    #[test]
    fn test_stage_run_with_candidate_restriction() {
        let mut stage = keyword_stage(None);
        stage
            .add(&[doc(0, "city a"), doc(1, "city b"), doc(2, "city c")])
            .unwrap();

        let upstream = vec![Hit::new(1).with_similarity(0.4), Hit::new(2)];
        let hits = stage.run("city", Some(&upstream)).unwrap();
        let keys: Vec<&Key> = hits.iter().map(|h| &h.key).collect();
        assert_eq!(keys, vec![&Key::Int(1), &Key::Int(2)]);

        // Scoreless restriction keeps the upstream similarity.
        assert_eq!(hits[0].similarity, Some(0.4));
    }

    #[test]
    fn test_stage_run_empty_upstream_short_circuits() {
        let mut stage = keyword_stage(None);
        stage.add(&[doc(0, "city")]).unwrap();
        assert!(stage.run("city", Some(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_unindexed_stage_returns_empty() {
        let stage = keyword_stage(Some(5));
        assert!(stage.run("city", None).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = StageConfig::new("id", ["article"]).with_k(0);
        assert!(RetrieverStage::new("bad", Box::new(KeywordRetriever::new()), config).is_err());
    }
}
