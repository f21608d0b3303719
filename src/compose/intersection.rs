//! Intersection composition: tighten precision by requiring agreement.
//!
//! Every branch answers the same query; only keys present in every
//! branch's result survive. Order, scores and fields come from the
//! leftmost branch. Any empty branch empties the whole intersection.

use super::{fan_out, Pipeline};
use crate::errors::Result;
use crate::types::{Hit, Key};
use rustc_hash::FxHashSet;

/// Keep the leftmost branch's hits whose keys every branch returned.
pub(crate) fn run(
    branches: &[Pipeline],
    query: &str,
    upstream: Option<&[Hit]>,
) -> Result<Vec<Hit>> {
    let mut results = fan_out(branches, query, upstream)?;
    #[cfg(feature = "tracing")]
    tracing::debug!(branches = branches.len(), "merging intersection branches");
    if results.iter().any(Vec::is_empty) || results.is_empty() {
        return Ok(Vec::new());
    }

    let rest = results.split_off(1);
    let mut first = results.pop().unwrap_or_default();
    for hits in &rest {
        let keys: FxHashSet<&Key> = hits.iter().map(|hit| &hit.key).collect();
        first.retain(|hit| keys.contains(&hit.key));
        if first.is_empty() {
            break;
        }
    }
    Ok(first)
}
