//! Sequential composition: each stage's output is the next stage's input.
//!
//! The candidate set can only narrow as it moves right. An empty
//! intermediate result short-circuits the chain: no later stage runs, and
//! the whole pipeline yields an empty sequence.

use super::Pipeline;
use crate::errors::Result;
use crate::types::Hit;

/// Thread a query through `stages` left to right.
///
/// The first stage receives `upstream` (usually `None`); every later
/// stage receives the previous stage's output as its candidate
/// restriction.
pub(crate) fn run(
    stages: &[Pipeline],
    query: &str,
    upstream: Option<&[Hit]>,
) -> Result<Vec<Hit>> {
    let Some((first, rest)) = stages.split_first() else {
        return Ok(Vec::new());
    };

    let mut current = first.run(query, upstream)?;
    for stage in rest {
        if current.is_empty() {
            return Ok(Vec::new());
        }
        current = stage.run(query, Some(&current))?;
    }
    Ok(current)
}
