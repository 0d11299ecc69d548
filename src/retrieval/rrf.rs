//! Weighted Reciprocal Rank Fusion, shared by the hybrid retriever (C5, vector+text branches,
//! equal weight) and the tier orchestrator (C7, three tiers, `w1/w2/w3`).

use std::collections::HashMap;

/// One ranked source list feeding a fusion: `items` must already be sorted best-first.
pub struct RankedSource<'a> {
    pub weight: f32,
    pub items: &'a [String],
}

/// `score(c) = Σ_s w_s / (k_rrf + rank_s(c))`, summed over every source list `c` appears in.
/// Returns `(chunk_id, fused_score)` sorted by descending score, ties broken by the best
/// (lowest) per-source rank across branches, then `chunk_id` ascending.
pub fn weighted_rrf(sources: &[RankedSource<'_>], k_rrf: u32) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();
    let mut best_rank: HashMap<String, usize> = HashMap::new();

    for source in sources {
        for (rank_zero_based, chunk_id) in source.items.iter().enumerate() {
            let rank = rank_zero_based + 1;
            let contribution = source.weight / (k_rrf as f32 + rank as f32);
            *scores.entry(chunk_id.clone()).or_insert(0.0) += contribution;
            best_rank
                .entry(chunk_id.clone())
                .and_modify(|r| *r = (*r).min(rank))
                .or_insert(rank);
        }
    }

    let mut fused: Vec<(String, f32)> = scores.into_iter().collect();
    fused.sort_by(|(id_a, score_a), (id_b, score_b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| best_rank[id_a].cmp(&best_rank[id_b]))
            .then_with(|| id_a.cmp(id_b))
    });
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_source_preserves_rank_order() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let fused = weighted_rrf(
            &[RankedSource { weight: 1.0, items: &items }],
            60,
        );
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused[1].0, "b");
        assert_eq!(fused[2].0, "c");
    }

    #[test]
    fn chunk_in_both_sources_outranks_single_source_hit() {
        let vector_items = vec!["x".to_string(), "shared".to_string()];
        let text_items = vec!["shared".to_string(), "y".to_string()];
        let fused = weighted_rrf(
            &[
                RankedSource { weight: 1.0, items: &vector_items },
                RankedSource { weight: 1.0, items: &text_items },
            ],
            60,
        );
        assert_eq!(fused[0].0, "shared");
    }

    #[test]
    fn weights_scale_contribution() {
        let a_items = vec!["only_a".to_string()];
        let b_items = vec!["only_b".to_string()];
        let fused = weighted_rrf(
            &[
                RankedSource { weight: 1.0, items: &a_items },
                RankedSource { weight: 0.5, items: &b_items },
            ],
            60,
        );
        let a_score = fused.iter().find(|(id, _)| id == "only_a").unwrap().1;
        let b_score = fused.iter().find(|(id, _)| id == "only_b").unwrap().1;
        assert!(a_score > b_score);
    }

    #[test]
    fn tie_breaks_by_chunk_id_when_rank_and_score_equal() {
        let items_1 = vec!["b".to_string(), "a".to_string()];
        let fused = weighted_rrf(&[RankedSource { weight: 1.0, items: &items_1 }], 60);
        // "b" ranked first so it must lead despite alphabetical ordering of ids.
        assert_eq!(fused[0].0, "b");
    }
}
