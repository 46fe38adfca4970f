use std::cmp::Ordering;
use std::collections::HashSet;

use crate::recommend::types::{CatalogEntry, RecommendationResult};

fn score_desc<T>(a: &RecommendationResult<T>, b: &RecommendationResult<T>) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

/// Flattens `lists` in the given order, keeps the first occurrence of each
/// item id, then sorts by score descending. The sort is stable, so equal
/// scores keep their input order and the earliest list wins attribution.
pub fn merge<T: CatalogEntry>(lists: Vec<Vec<RecommendationResult<T>>>) -> Vec<RecommendationResult<T>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<RecommendationResult<T>> = lists
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.id().to_string()))
        .collect();
    merged.sort_by(score_desc);
    merged
}

/// Distributes candidates over buckets of fixed quota.
///
/// Each `(candidates, quota)` pair is served in order, skipping ids an
/// earlier bucket already took. Afterwards any shortfall against `total` is
/// topped up from the unused candidates, again in bucket order. An id never
/// lands in two buckets, and the result holds `min(total, distinct ids)`
/// items whenever no bucket was cut below `total` candidates.
pub fn fill_quotas<T: CatalogEntry>(
    buckets: Vec<(Vec<RecommendationResult<T>>, usize)>,
    total: usize,
) -> Vec<Vec<RecommendationResult<T>>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut picked: Vec<Vec<RecommendationResult<T>>> = Vec::with_capacity(buckets.len());
    let mut spare: Vec<Vec<RecommendationResult<T>>> = Vec::with_capacity(buckets.len());

    for (candidates, quota) in buckets {
        let mut taken = Vec::new();
        let mut rest = Vec::new();
        for candidate in candidates {
            if taken.len() < quota && !seen.contains(candidate.id()) {
                seen.insert(candidate.id().to_string());
                taken.push(candidate);
            } else {
                rest.push(candidate);
            }
        }
        picked.push(taken);
        spare.push(rest);
    }

    let mut missing = total.saturating_sub(picked.iter().map(Vec::len).sum());
    for (taken, rest) in picked.iter_mut().zip(spare) {
        for candidate in rest {
            if missing == 0 {
                break;
            }
            if seen.insert(candidate.id().to_string()) {
                taken.push(candidate);
                missing -= 1;
            }
        }
    }
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::types::StrategyType;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str);

    impl CatalogEntry for Item {
        fn entry_id(&self) -> &str {
            self.0
        }
    }

    fn r(id: &'static str, score: f64, strategy: StrategyType) -> RecommendationResult<Item> {
        RecommendationResult {
            item: Item(id),
            reason: strategy.as_str().to_string(),
            score,
            strategy_type: strategy,
        }
    }

    #[test]
    fn first_seen_wins_even_when_later_scores_higher() {
        let merged = merge(vec![
            vec![r("a", 0.6, StrategyType::Exploration)],
            vec![r("a", 0.9, StrategyType::Weakness), r("b", 0.9, StrategyType::Weakness)],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id(), "b");
        assert_eq!(merged[1].id(), "a");
        assert_eq!(merged[1].strategy_type, StrategyType::Exploration);
        assert_eq!(merged[1].score, 0.6);
    }

    #[test]
    fn ties_keep_input_order() {
        let merged = merge(vec![
            vec![r("x", 0.8, StrategyType::Progressive), r("y", 0.8, StrategyType::Progressive)],
            vec![r("z", 0.8, StrategyType::Review)],
        ]);
        let ids: Vec<&str> = merged.iter().map(|m| m.id()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    fn ids(bucket: &[RecommendationResult<Item>]) -> Vec<&str> {
        bucket.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn fill_quotas_skips_ids_taken_by_earlier_buckets() {
        let w = StrategyType::Weakness;
        let p = StrategyType::Progressive;
        let out = fill_quotas(
            vec![
                (vec![r("a", 0.9, w), r("b", 0.9, w), r("c", 0.9, w)], 2),
                (vec![r("a", 0.8, p), r("b", 0.8, p), r("c", 0.8, p), r("d", 0.8, p)], 2),
            ],
            4,
        );
        assert_eq!(ids(&out[0]), vec!["a", "b"]);
        assert_eq!(ids(&out[1]), vec!["c", "d"]);
    }

    #[test]
    fn fill_quotas_tops_up_shortfall_in_bucket_order() {
        let w = StrategyType::Weakness;
        let e = StrategyType::Exploration;
        // 第二个桶没有候选，缺口由第一个桶补齐
        let out = fill_quotas(
            vec![
                (vec![r("a", 0.9, w), r("b", 0.9, w), r("c", 0.9, w), r("d", 0.9, w)], 2),
                (Vec::new(), 2),
                (vec![r("a", 0.6, e), r("e", 0.6, e)], 1),
            ],
            5,
        );
        assert_eq!(ids(&out[0]), vec!["a", "b", "c", "d"]);
        assert!(out[1].is_empty());
        assert_eq!(ids(&out[2]), vec!["e"]);
    }

    #[test]
    fn fill_quotas_stops_at_distinct_candidates() {
        let w = StrategyType::Weakness;
        let out = fill_quotas(vec![(vec![r("a", 0.9, w)], 3), (vec![r("a", 0.8, w)], 3)], 6);
        assert_eq!(out.iter().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn empty_input_merges_to_empty() {
        let merged: Vec<RecommendationResult<Item>> = merge(Vec::new());
        assert!(merged.is_empty());
    }
}
