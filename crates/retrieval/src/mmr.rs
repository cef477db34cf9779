//! Maximal Marginal Relevance diversification.
//!
//! Similarity between two candidates is binary: `1.0` when they share
//! a `doc_id` and neither is a resolver fallback match, else `0.0`.
//! This keeps the embedding space out of the diversification step
//! entirely — it only suppresses near-duplicate chunks from the same
//! source document.

use legal_rag_core::SearchResult;

fn is_fallback(result: &SearchResult) -> bool {
    let meta = result.metadata();
    meta.fallback_match || meta.fallback_doc_match
}

fn pairwise_similarity(a: &SearchResult, b: &SearchResult) -> f32 {
    if a.doc_id() == b.doc_id() && !is_fallback(a) && !is_fallback(b) {
        1.0
    } else {
        0.0
    }
}

/// Greedily selects up to `k` results maximizing
/// `lambda * relevance - (1 - lambda) * max_similarity_to_selected`.
pub fn mmr_select(candidates: Vec<SearchResult>, k: usize, lambda: f32) -> Vec<SearchResult> {
    if candidates.len() <= k {
        return candidates;
    }

    let mut pool = candidates;
    let mut selected: Vec<SearchResult> = Vec::with_capacity(k);

    while selected.len() < k && !pool.is_empty() {
        let mut best_idx = 0usize;
        let mut best_score = f32::NEG_INFINITY;

        for (idx, candidate) in pool.iter().enumerate() {
            let relevance = candidate.final_score();
            let max_sim = selected
                .iter()
                .map(|s| pairwise_similarity(candidate, s))
                .fold(0.0_f32, f32::max);
            let mmr_score = lambda * relevance - (1.0 - lambda) * max_sim;
            if mmr_score > best_score {
                best_score = mmr_score;
                best_idx = idx;
            }
        }

        selected.push(pool.remove(best_idx));
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::ResultMetadata;

    fn result(id: &str, doc_id: &str, score: f32, fallback: bool) -> SearchResult {
        let metadata = ResultMetadata {
            doc_id: doc_id.into(),
            final_score: score,
            fallback_match: fallback,
            ..Default::default()
        };
        SearchResult::Case {
            id: id.into(),
            similarity_score: score,
            content: "text".into(),
            metadata,
            authority_weight: 1.0,
        }
    }

    #[test]
    fn prefers_diverse_documents_over_near_duplicates() {
        let candidates = vec![
            result("a", "doc1", 0.9, false),
            result("b", "doc1", 0.85, false),
            result("c", "doc2", 0.7, false),
        ];
        let selected = mmr_select(candidates, 2, 0.7);
        let ids: Vec<&str> = selected.iter().map(|r| r.id()).collect();
        assert_eq!(ids[0], "a");
        assert_eq!(ids[1], "c");
    }

    #[test]
    fn fallback_matches_are_never_penalized_for_similarity() {
        let candidates = vec![
            result("a", "doc1", 0.9, true),
            result("b", "doc1", 0.85, true),
            result("c", "doc2", 0.1, false),
        ];
        let selected = mmr_select(candidates, 2, 0.7);
        let ids: Vec<&str> = selected.iter().map(|r| r.id()).collect();
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"b"));
    }

    #[test]
    fn returns_all_candidates_when_fewer_than_k() {
        let candidates = vec![result("a", "doc1", 0.9, false)];
        let selected = mmr_select(candidates, 5, 0.7);
        assert_eq!(selected.len(), 1);
    }
}
