//! # searchpipe
//!
//! A composable neural-search pipeline library. Heterogeneous search
//! stages — keyword retrievers, embedding rankers, document mappers and
//! QA/summarization transforms — combine through three operators into a
//! single queryable pipeline:
//!
//! - `+` sequential: each stage narrows the previous stage's candidates
//! - `|` union: branches merge, duplicates removed first-seen-wins
//! - `&` intersection: only keys every branch returns survive
//!
//! Models (embedding encoders, QA models, external search backends) stay
//! behind traits; the library owns orchestration, never inference.
//!
//! ## Example
//!
//! ```
//! use searchpipe::{Document, KeywordRetriever, Mapper, RetrieverStage, StageConfig};
//!
//! # fn main() -> searchpipe::Result<()> {
//! let documents = vec![
//!     Document::new().with_field("id", 0).with_field("article", "Paris is the capital of France"),
//!     Document::new().with_field("id", 1).with_field("article", "Lyon sits on the Rhone"),
//! ];
//!
//! let retriever = RetrieverStage::new(
//!     "keyword",
//!     Box::new(KeywordRetriever::new()),
//!     StageConfig::new("id", ["article"]).with_k(10),
//! )?;
//!
//! let mut pipeline = retriever + Mapper::new("id")?;
//! pipeline.add(&documents)?;
//!
//! let hits = pipeline.search("capital of France")?;
//! assert_eq!(hits[0].fields.get("article").unwrap(), "Paris is the capital of France");
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod errors;
pub mod stage;
pub mod types;

pub use compose::Pipeline;
pub use errors::{PipelineError, Result};
pub use stage::{
    EmbeddingCache, Encoder, KeywordRetriever, Mapper, RankerStage, Retriever, RetrieverStage,
    Stage, TransformStage, Transformer,
};
pub use types::{Document, Hit, Key, ScoredKey, StageConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
