//! Pipeline composition tree, lifecycle and query execution.
//!
//! A [`Pipeline`] is a tree of stages combined by three operators:
//! sequential (`+`), union (`|`) and intersection (`&`). The tree is
//! structurally immutable once built; only the per-stage indices mutate,
//! through [`Pipeline::add`].
//!
//! ## Submodules
//!
//! - [`sequential`] — left-to-right threading with empty short-circuit
//! - [`union`] — recall-broadening merge, first-seen-wins de-duplication
//! - [`intersection`] — precision-tightening merge, leftmost provenance
//! - [`ops`] — `+` / `|` / `&` operator sugar over the builder API

pub mod intersection;
pub mod ops;
pub mod sequential;
pub mod union;

use crate::errors::Result;
use crate::stage::Stage;
use crate::types::{Document, Hit};
use rayon::prelude::*;
use std::fmt;

/// Enter a tracing span for a pipeline node (when the `tracing` feature is
/// enabled). When disabled, this is a no-op and the compiler eliminates it.
macro_rules! trace_node {
    ($role:expr, $name:expr) => {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("pipeline_node", role = $role, name = $name).entered();
    };
}

// ============================================================================
// Pipeline
// ============================================================================

/// A composition tree of stages.
///
/// Leaves are stages; inner nodes are the three composition operators.
/// Querying takes `&self` and is safe to run concurrently once indexing is
/// done; `add` takes `&mut self`, so the borrow checker enforces the
/// single-writer discipline for index mutation.
#[derive(Debug)]
pub enum Pipeline {
    /// A single stage
    Stage(Stage),
    /// Stages applied left to right, each narrowing the candidate set
    Sequential(Vec<Pipeline>),
    /// Branches run independently, results merged with de-duplication
    Union(Vec<Pipeline>),
    /// Branches run independently, only keys present in all survive
    Intersection(Vec<Pipeline>),
}

impl Pipeline {
    /// Wrap a single stage as a leaf pipeline
    pub fn stage(stage: impl Into<Stage>) -> Self {
        Pipeline::Stage(stage.into())
    }

    /// Compose pipelines sequentially: each one's output feeds the next.
    /// Nested sequential children are flattened into one level.
    pub fn sequential(stages: Vec<Pipeline>) -> Self {
        let mut flat = Vec::with_capacity(stages.len());
        for stage in stages {
            match stage {
                Pipeline::Sequential(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Pipeline::Sequential(flat)
    }

    /// Combine branches as a union: same query to every branch, results
    /// concatenated in branch order and de-duplicated by key.
    pub fn union_of(branches: Vec<Pipeline>) -> Self {
        let mut flat = Vec::with_capacity(branches.len());
        for branch in branches {
            match branch {
                Pipeline::Union(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Pipeline::Union(flat)
    }

    /// Combine branches as an intersection: only keys every branch agrees
    /// on survive, in the leftmost branch's order.
    pub fn intersection_of(branches: Vec<Pipeline>) -> Self {
        let mut flat = Vec::with_capacity(branches.len());
        for branch in branches {
            match branch {
                Pipeline::Intersection(children) => flat.extend(children),
                other => flat.push(other),
            }
        }
        Pipeline::Intersection(flat)
    }

    /// Propagate a document collection to every composed stage, in
    /// left-to-right / branch order. Each stage builds or refreshes its
    /// own internal representation from the same collection.
    pub fn add(&mut self, documents: &[Document]) -> Result<&mut Self> {
        match self {
            Pipeline::Stage(stage) => stage.add(documents)?,
            Pipeline::Sequential(children)
            | Pipeline::Union(children)
            | Pipeline::Intersection(children) => {
                for child in children.iter_mut() {
                    child.add(documents)?;
                }
            }
        }
        Ok(self)
    }

    /// Run the pipeline on a query, producing the final result sequence.
    pub fn search(&self, query: &str) -> Result<Vec<Hit>> {
        self.run(query, None)
    }

    /// Execute this node with an optional upstream candidate restriction.
    pub(crate) fn run(&self, query: &str, upstream: Option<&[Hit]>) -> Result<Vec<Hit>> {
        match self {
            Pipeline::Stage(stage) => {
                trace_node!(stage.role(), stage.name());
                stage.run(query, upstream)
            }
            Pipeline::Sequential(stages) => {
                trace_node!("sequential", "");
                sequential::run(stages, query, upstream)
            }
            Pipeline::Union(branches) => {
                trace_node!("union", "");
                union::run(branches, query, upstream)
            }
            Pipeline::Intersection(branches) => {
                trace_node!("intersection", "");
                intersection::run(branches, query, upstream)
            }
        }
    }

    /// Key field declared by the leftmost stage, if the tree has one.
    pub fn key_field(&self) -> Option<&str> {
        match self {
            Pipeline::Stage(stage) => Some(stage.key_field()),
            Pipeline::Sequential(children)
            | Pipeline::Union(children)
            | Pipeline::Intersection(children) => {
                children.iter().find_map(Pipeline::key_field)
            }
        }
    }

    /// Append a mapping stage pre-loaded with `documents`, resolving the
    /// pipeline's keys back to full documents.
    ///
    /// The mapper is keyed on the leftmost stage's key field. Fails when
    /// the tree has no stage or a document lacks that field.
    pub fn with_documents(self, documents: &[Document]) -> Result<Pipeline> {
        let key_field = self
            .key_field()
            .ok_or_else(|| crate::errors::PipelineError::invalid_config(
                "cannot infer a key field from an empty pipeline",
            ))?
            .to_string();
        let mapper = crate::stage::Mapper::from_documents(key_field, documents)?;
        Ok(Pipeline::sequential(vec![self, Pipeline::stage(mapper)]))
    }

    /// Number of stages in the tree
    pub fn num_stages(&self) -> usize {
        match self {
            Pipeline::Stage(_) => 1,
            Pipeline::Sequential(children)
            | Pipeline::Union(children)
            | Pipeline::Intersection(children) => {
                children.iter().map(Pipeline::num_stages).sum()
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            Pipeline::Stage(stage) => writeln!(f, "{pad}{stage}"),
            Pipeline::Sequential(children) => {
                writeln!(f, "{pad}sequential")?;
                children.iter().try_for_each(|c| c.fmt_node(f, indent + 1))
            }
            Pipeline::Union(children) => {
                writeln!(f, "{pad}union")?;
                children.iter().try_for_each(|c| c.fmt_node(f, indent + 1))
            }
            Pipeline::Intersection(children) => {
                writeln!(f, "{pad}intersection")?;
                children.iter().try_for_each(|c| c.fmt_node(f, indent + 1))
            }
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0)
    }
}

/// Fan the same query (and the same upstream restriction) out to every
/// branch. Branches are read-only with respect to each other during a
/// query, so they run in parallel; results come back in branch order, so
/// the merge stays deterministic.
pub(crate) fn fan_out(
    branches: &[Pipeline],
    query: &str,
    upstream: Option<&[Hit]>,
) -> Result<Vec<Vec<Hit>>> {
    if branches.len() < 2 {
        return branches
            .iter()
            .map(|branch| branch.run(query, upstream))
            .collect();
    }
    branches
        .par_iter()
        .map(|branch| branch.run(query, upstream))
        .collect()
}
