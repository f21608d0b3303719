//! Property-based tests for the composition operators.
//!
//! Branch outputs are generated as ranked key tables and replayed through
//! scripted retrievers, so the properties hold for arbitrary branch
//! shapes, not just hand-picked fixtures.

use proptest::prelude::*;
use searchpipe::{
    Key, Pipeline, Result, Retriever, RetrieverStage, ScoredKey, StageConfig,
};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct Scripted(Vec<ScoredKey>);

impl Retriever for Scripted {
    fn index(&mut self, _entries: &[(Key, String)]) -> Result<()> {
        Ok(())
    }

    fn search(&self, _query: &str, limit: Option<usize>) -> Result<Vec<ScoredKey>> {
        let mut out = self.0.clone();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

fn scripted_stage(results: Vec<ScoredKey>, k: Option<usize>) -> Pipeline {
    let mut config = StageConfig::new("id", ["article"]);
    if let Some(k) = k {
        config = config.with_k(k);
    }
    let stage = RetrieverStage::new("scripted", Box::new(Scripted(results)), config).unwrap();
    Pipeline::stage(stage)
}

/// One branch: a ranked list of unique small-range keys, so overlap
/// between branches is common.
fn branch_strategy() -> impl Strategy<Value = Vec<ScoredKey>> {
    proptest::collection::vec((0i64..20, 0.0f64..1.0), 0..12).prop_map(|pairs| {
        let mut seen = HashSet::new();
        pairs
            .into_iter()
            .filter(|(key, _)| seen.insert(*key))
            .map(|(key, score)| ScoredKey::scored(key, score))
            .collect()
    })
}

fn branches_strategy() -> impl Strategy<Value = Vec<Vec<ScoredKey>>> {
    proptest::collection::vec(branch_strategy(), 2..5)
}

fn keys(hits: &[searchpipe::Hit]) -> Vec<Key> {
    hits.iter().map(|h| h.key.clone()).collect()
}

proptest! {
    #[test]
    fn union_has_no_duplicates_and_covers_all_branches(branches in branches_strategy()) {
        let pipeline = Pipeline::union_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );
        let hits = pipeline.search("q").unwrap();

        let result_keys = keys(&hits);
        let unique: HashSet<&Key> = result_keys.iter().collect();
        prop_assert_eq!(unique.len(), result_keys.len());

        let expected: HashSet<Key> = branches
            .iter()
            .flatten()
            .map(|s| s.key.clone())
            .collect();
        prop_assert_eq!(unique.len(), expected.len());
        prop_assert!(result_keys.iter().all(|k| expected.contains(k)));
    }

    #[test]
    fn union_first_seen_wins(branches in branches_strategy()) {
        let pipeline = Pipeline::union_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );
        let hits = pipeline.search("q").unwrap();

        for hit in &hits {
            let first = branches
                .iter()
                .flatten()
                .find(|s| s.key == hit.key)
                .unwrap();
            prop_assert_eq!(hit.similarity, first.score);
        }
    }

    #[test]
    fn union_preserves_first_branch_prefix(branches in branches_strategy()) {
        let pipeline = Pipeline::union_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );
        let hits = pipeline.search("q").unwrap();

        // The first branch's keys open the merged sequence, in order.
        let first_branch: Vec<Key> = branches[0].iter().map(|s| s.key.clone()).collect();
        prop_assert_eq!(&keys(&hits)[..first_branch.len()], &first_branch[..]);
    }

    #[test]
    fn intersection_is_first_branch_restricted(branches in branches_strategy()) {
        let pipeline = Pipeline::intersection_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );
        let hits = pipeline.search("q").unwrap();

        let common: HashSet<Key> = branches
            .iter()
            .map(|b| b.iter().map(|s| s.key.clone()).collect::<HashSet<Key>>())
            .reduce(|acc, set| acc.intersection(&set).cloned().collect())
            .unwrap_or_default();

        let expected: Vec<Key> = branches[0]
            .iter()
            .map(|s| s.key.clone())
            .filter(|k| common.contains(k))
            .collect();
        prop_assert_eq!(keys(&hits), expected);

        // Scores come from the first branch.
        for hit in &hits {
            let origin = branches[0].iter().find(|s| s.key == hit.key).unwrap();
            prop_assert_eq!(hit.similarity, origin.score);
        }
    }

    #[test]
    fn truncation_never_exceeds_k(branch in branch_strategy(), k in 1usize..8) {
        let pipeline = scripted_stage(branch.clone(), Some(k));
        let hits = pipeline.search("q").unwrap();
        prop_assert!(hits.len() <= k);
        prop_assert!(hits.len() <= branch.len());
    }

    #[test]
    fn composed_queries_are_deterministic(branches in branches_strategy()) {
        let union = Pipeline::union_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );
        let inter = Pipeline::intersection_of(
            branches.iter().cloned().map(|b| scripted_stage(b, None)).collect(),
        );

        let union_first = union.search("q").unwrap();
        let inter_first = inter.search("q").unwrap();
        for _ in 0..5 {
            prop_assert_eq!(&union.search("q").unwrap(), &union_first);
            prop_assert_eq!(&inter.search("q").unwrap(), &inter_first);
        }
    }
}
