//! Stage roles and role dispatch.
//!
//! A [`Stage`] is one named processing step. Roles form a closed set —
//! retriever, ranker, mapper, transform — and the composition engine
//! dispatches on the variant rather than probing capabilities at runtime.
//!
//! ## Submodules
//!
//! - [`retriever`] — candidate generation from a query
//! - [`ranker`] — semantic re-scoring over an embedding cache
//! - [`mapper`] — key → document resolution
//! - [`transform`] — QA/summarization style derived fields

pub mod mapper;
pub mod ranker;
pub mod retriever;
pub mod transform;

pub use mapper::Mapper;
pub use ranker::{EmbeddingCache, Encoder, RankerStage};
pub use retriever::{KeywordRetriever, Retriever, RetrieverStage};
pub use transform::{TransformStage, Transformer};

use crate::errors::Result;
use crate::types::{Document, Hit};
use std::fmt;

/// A single named processing step with a key field and an
/// input/output contract.
#[derive(Debug)]
pub enum Stage {
    /// Initial candidate generation
    Retriever(RetrieverStage),
    /// Semantic re-scoring of candidates
    Ranker(RankerStage),
    /// Key → document resolution
    Mapper(Mapper),
    /// Derived-field post-processing
    Transform(TransformStage),
}

impl Stage {
    /// Stage name (for logging and pipeline display)
    pub fn name(&self) -> &str {
        match self {
            Stage::Retriever(s) => s.name(),
            Stage::Ranker(s) => s.name(),
            Stage::Mapper(s) => s.name(),
            Stage::Transform(s) => s.name(),
        }
    }

    /// Role label of this stage
    pub fn role(&self) -> &'static str {
        match self {
            Stage::Retriever(_) => "retriever",
            Stage::Ranker(_) => "ranker",
            Stage::Mapper(_) => "mapper",
            Stage::Transform(_) => "transform",
        }
    }

    /// Name of the stage's declared key field
    pub fn key_field(&self) -> &str {
        match self {
            Stage::Retriever(s) => s.config().key(),
            Stage::Ranker(s) => s.config().key(),
            Stage::Mapper(s) => s.key_field(),
            Stage::Transform(s) => s.config().key(),
        }
    }

    /// Ingest a document collection, building whatever internal
    /// representation this stage role needs. Transitions the stage from
    /// empty to indexed; duplicate keys overwrite.
    pub fn add(&mut self, documents: &[Document]) -> Result<()> {
        match self {
            Stage::Retriever(s) => s.add(documents),
            Stage::Ranker(s) => s.add(documents),
            Stage::Mapper(s) => s.add(documents),
            Stage::Transform(s) => s.add(documents),
        }
    }

    /// Produce up to `k` results for `query`, optionally restricted to the
    /// upstream candidate sequence. Side effects never leave the stage's
    /// own store; an un-indexed stage yields an empty sequence.
    pub fn run(&self, query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        match self {
            Stage::Retriever(s) => s.run(query, upstream),
            Stage::Ranker(s) => s.run(query, upstream),
            Stage::Mapper(s) => s.run(query, upstream),
            Stage::Transform(s) => s.run(query, upstream),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Mapper(s) => write!(f, "{} {} (key: {})", s.name(), self.role(), s.key_field()),
            Stage::Retriever(s) => write!(f, "{} {} ({})", s.name(), self.role(), s.config()),
            Stage::Ranker(s) => write!(f, "{} {} ({})", s.name(), self.role(), s.config()),
            Stage::Transform(s) => write!(f, "{} {} ({})", s.name(), self.role(), s.config()),
        }
    }
}

impl From<RetrieverStage> for Stage {
    fn from(stage: RetrieverStage) -> Self {
        Stage::Retriever(stage)
    }
}

impl From<RankerStage> for Stage {
    fn from(stage: RankerStage) -> Self {
        Stage::Ranker(stage)
    }
}

impl From<Mapper> for Stage {
    fn from(stage: Mapper) -> Self {
        Stage::Mapper(stage)
    }
}

impl From<TransformStage> for Stage {
    fn from(stage: TransformStage) -> Self {
        Stage::Transform(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StageConfig;

    #[test]
    fn test_role_dispatch_and_display() {
        let retriever = RetrieverStage::new(
            "keyword",
            Box::new(KeywordRetriever::new()),
            StageConfig::new("id", ["article"]).with_k(10),
        )
        .unwrap();
        let stage: Stage = retriever.into();

        assert_eq!(stage.role(), "retriever");
        assert_eq!(stage.name(), "keyword");
        assert_eq!(stage.key_field(), "id");

        let rendered = stage.to_string();
        assert!(rendered.contains("keyword retriever"));
        assert!(rendered.contains("k: 10"));
    }

    #[test]
    fn test_unindexed_stage_is_empty() {
        let stage: Stage = Mapper::new("id").unwrap().into();
        assert!(stage.run("q", Some(&[Hit::new(1)])).unwrap().is_empty());
    }
}
