//! Union composition: broaden recall by merging independent branches.
//!
//! Every branch answers the same query; results are concatenated in
//! branch order and de-duplicated by key. The first occurrence of a key
//! wins, keeping its score and fields. No re-sorting happens here —
//! branch order is the ranking signal a union expresses.

use super::{fan_out, Pipeline};
use crate::errors::Result;
use crate::types::{Hit, Key};
use rustc_hash::FxHashSet;

/// Merge branch results with first-seen-wins de-duplication.
pub(crate) fn run(
    branches: &[Pipeline],
    query: &str,
    upstream: Option<&[Hit]>,
) -> Result<Vec<Hit>> {
    let results = fan_out(branches, query, upstream)?;
    #[cfg(feature = "tracing")]
    tracing::debug!(branches = branches.len(), "merging union branches");

    let mut seen: FxHashSet<Key> = FxHashSet::default();
    let mut merged = Vec::with_capacity(results.iter().map(Vec::len).sum());
    for hits in results {
        for hit in hits {
            if seen.insert(hit.key.clone()) {
                merged.push(hit);
            }
        }
    }
    Ok(merged)
}
