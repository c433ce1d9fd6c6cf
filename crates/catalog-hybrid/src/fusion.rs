use std::collections::{HashMap, HashSet};

use catalog_core::types::{FusionWeights, ProductId, RankedResultSet, ScoredResult};

/// Min-max normalize one channel into `[0, 1]`. A channel whose scores are all
/// equal maps every entry to 1.0.
pub fn normalize_channel(results: &mut [ScoredResult]) {
    let Some(first) = results.first() else { return };
    let (min, max) = results.iter().fold((first.score, first.score), |(lo, hi), r| (lo.min(r.score), hi.max(r.score)));
    let range = max - min;
    for r in results.iter_mut() {
        r.score = if range > 0.0 { (r.score - min) / range } else { 1.0 };
    }
}

/// Weighted sum of two independently retrieved channels.
///
/// Each channel is deduplicated (best-ranked occurrence wins) and min-max
/// normalized, then `fts * lexical + semantic * semantic` is accumulated per
/// product. A channel with weight 0 is skipped entirely, so its candidates are
/// never admitted. The sort is stable: equal scores keep first-seen order,
/// lexical candidates first.
pub fn fuse(lexical: Vec<ScoredResult>, semantic: Vec<ScoredResult>, weights: FusionWeights, limit: usize) -> RankedResultSet {
    let mut fused: Vec<ScoredResult> = Vec::new();
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    for (channel, weight) in [(lexical, weights.fts), (semantic, weights.semantic)] {
        if weight <= 0.0 || channel.is_empty() { continue; }
        let mut seen = HashSet::new();
        let mut channel: Vec<ScoredResult> = channel.into_iter().filter(|r| seen.insert(r.id.clone())).collect();
        normalize_channel(&mut channel);
        for r in channel {
            let contribution = weight * r.score;
            match positions.get(&r.id) {
                Some(&pos) => {
                    let entry = &mut fused[pos];
                    entry.score += contribution;
                    for (key, value) in r.attributes {
                        entry.attributes.entry(key).or_insert(value);
                    }
                }
                None => {
                    positions.insert(r.id.clone(), fused.len());
                    fused.push(ScoredResult { score: contribution, ..r });
                }
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    RankedResultSet::from_ranked(fused, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::types::Attributes;

    fn r(id: &str, score: f32) -> ScoredResult { ScoredResult::new(id, score, Attributes::new()) }

    #[test]
    fn flat_channel_normalizes_to_one() {
        let mut c = vec![r("a", 3.0), r("b", 3.0)];
        normalize_channel(&mut c);
        assert!(c.iter().all(|x| x.score == 1.0));
    }

    #[test]
    fn both_channels_sum_once() {
        let set = fuse(
            vec![r("a", 10.0), r("b", 5.0), r("c", 0.0)],
            vec![r("b", 0.9), r("d", 0.1)],
            FusionWeights::new(0.5, 0.5),
            10,
        );
        // a: 0.5*1, b: 0.5*0.5 + 0.5*1, c: 0, d: 0
        assert_eq!(set.ids(), vec!["b", "a", "c", "d"]);
        assert!((set.as_slice()[0].score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn weights_are_free_multipliers() {
        let set = fuse(
            vec![r("a", 10.0), r("b", 5.0), r("c", 0.0)],
            vec![r("b", 0.9), r("d", 0.5), r("e", 0.1)],
            FusionWeights::new(2.0, 3.0),
            10,
        );
        // a: 2*1, b: 2*0.5 + 3*1, c: 0, d: 3*0.5, e: 0
        assert_eq!(set.ids(), vec!["b", "a", "d", "c", "e"]);
        let scores: Vec<f32> = set.as_slice().iter().map(|x| x.score).collect();
        for (got, want) in scores.iter().zip([4.0, 2.0, 1.5, 0.0, 0.0]) {
            assert!((got - want).abs() < 1e-6, "{scores:?}");
        }
    }
}
