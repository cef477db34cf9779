//! Fusion.
//!
//! Statutes fuse dense + sparse candidates via a weighted, normalized
//! score combination. Cases fuse via Reciprocal Rank Fusion plus a
//! vector-score term and a set of additive, mutually-exclusive-within-
//! category boosts.

use std::collections::HashMap;

use legal_rag_config::RetrievalConfig;
use legal_rag_core::SearchResult;

fn minmax_normalize(scores: &[f32]) -> Vec<f32> {
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if !(max > min) {
        return scores.iter().map(|_| 1.0).collect();
    }
    scores.iter().map(|s| (s - min) / (max - min)).collect()
}

/// Weighted normalized-score fusion for statute candidates:
/// `0.6*vec_norm + 0.25*keyword_norm + 0.1*recency + 0.05*(authority-1)`,
/// plus `statute_section_match_boost` when the candidate's `section_no`
/// appears among `section_guesses`. `recency_score` and
/// `authority_weight` are assumed already attached to each candidate's
/// metadata before this call.
pub fn fuse_statutes(
    mut vector_hits: Vec<SearchResult>,
    keyword_hits: Vec<SearchResult>,
    section_guesses: &[String],
    config: &RetrievalConfig,
) -> Vec<SearchResult> {
    let mut by_id: HashMap<String, SearchResult> = HashMap::new();

    let vector_scores: Vec<f32> = vector_hits.iter().map(|r| r.similarity_score()).collect();
    let vector_norm = minmax_normalize(&vector_scores);
    for (hit, norm) in vector_hits.drain(..).zip(vector_norm) {
        let mut hit = hit;
        hit.metadata_mut().vector_score = norm;
        by_id.insert(hit.id().to_string(), hit);
    }

    let keyword_scores: Vec<f32> = keyword_hits.iter().map(|r| r.similarity_score()).collect();
    let keyword_norm = minmax_normalize(&keyword_scores);
    for (hit, norm) in keyword_hits.into_iter().zip(keyword_norm) {
        by_id
            .entry(hit.id().to_string())
            .and_modify(|existing| existing.metadata_mut().keyword_score = norm)
            .or_insert_with(|| {
                let mut hit = hit;
                hit.metadata_mut().keyword_score = norm;
                hit
            });
    }

    let mut fused: Vec<SearchResult> = by_id
        .into_values()
        .map(|mut result| {
            let meta = result.metadata().clone();
            let authority = match &result {
                SearchResult::Statute { authority_weight, .. } => *authority_weight,
                SearchResult::Case { authority_weight, .. } => *authority_weight,
            };
            let mut score = config.statute_vector_weight * meta.vector_score
                + config.statute_keyword_weight * meta.keyword_score
                + config.statute_recency_weight * meta.recency_score
                + config.statute_authority_weight * (authority - 1.0);
            if let Some(section_no) = &meta.section_no {
                if section_guesses.iter().any(|guess| guess.contains(section_no.as_str())) {
                    score += config.statute_section_match_boost;
                }
            }
            result.metadata_mut().final_score = score;
            result
        })
        .collect();

    fused.sort_by(|a, b| b.final_score().partial_cmp(&a.final_score()).unwrap());
    fused
}

/// Reciprocal Rank Fusion contribution for one ranked list: `1/(k+rank)`,
/// rank is 1-indexed.
fn rrf_contribution(rank: usize, k: f32) -> f32 {
    1.0 / (k + rank as f32)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaseBoostFlags {
    pub authority: bool,
    pub recency: bool,
    pub topical_one: bool,
    pub topical_two: bool,
    pub statute_bridge: bool,
    pub resolver_party: bool,
    pub resolver_party_or: bool,
    pub resolver_other: bool,
}

/// Applies the case fusion formula to a single candidate: RRF sum +
/// `case_vector_weight * vector_norm` + the applicable additive boosts.
/// The three resolver boosts are mutually exclusive; when more than one
/// flag is set, the highest-value one wins.
pub fn case_boost_score(
    rrf_sum: f32,
    vector_norm: f32,
    flags: CaseBoostFlags,
    config: &RetrievalConfig,
) -> f32 {
    let mut score = rrf_sum + config.case_vector_weight * vector_norm;

    if flags.authority {
        score += config.case_authority_boost;
    }
    if flags.recency {
        score += config.case_recency_boost;
    }
    if flags.topical_one {
        score += config.case_topical_boost_one;
    } else if flags.topical_two {
        score += config.case_topical_boost_two;
    }
    if flags.statute_bridge {
        score += config.case_bridge_boost;
    }

    let resolver_candidates = [
        (flags.resolver_party, config.resolver_party_boost),
        (flags.resolver_party_or, config.resolver_party_or_boost),
        (flags.resolver_other, config.resolver_other_boost),
    ];
    if let Some((_, boost)) = resolver_candidates
        .iter()
        .filter(|(active, _)| *active)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    {
        score += boost;
    }

    score
}

/// Fuses case candidates from up to four ranked lists (statute-filtered
/// ANN/BM25 and unfiltered ANN/BM25) via RRF, then applies the
/// additive boosts per candidate.
pub fn fuse_cases(
    ranked_lists: Vec<Vec<SearchResult>>,
    boost_lookup: impl Fn(&SearchResult) -> CaseBoostFlags,
    config: &RetrievalConfig,
) -> Vec<SearchResult> {
    let mut rrf_sums: HashMap<String, f32> = HashMap::new();
    let mut vector_scores: HashMap<String, f32> = HashMap::new();
    let mut canonical: HashMap<String, SearchResult> = HashMap::new();

    for list in &ranked_lists {
        for (idx, hit) in list.iter().enumerate() {
            let rank = idx + 1;
            *rrf_sums.entry(hit.id().to_string()).or_insert(0.0) +=
                rrf_contribution(rank, config.rrf_k);
            vector_scores
                .entry(hit.id().to_string())
                .or_insert_with(|| hit.similarity_score());
        }
    }
    for list in ranked_lists {
        for hit in list {
            canonical.entry(hit.id().to_string()).or_insert(hit);
        }
    }

    let raw_vector_scores: Vec<f32> = vector_scores.values().cloned().collect();
    let normalized = minmax_normalize(&raw_vector_scores);
    let ids: Vec<String> = vector_scores.keys().cloned().collect();
    let vector_norm_by_id: HashMap<String, f32> = ids.into_iter().zip(normalized).collect();

    let mut fused: Vec<SearchResult> = canonical
        .into_iter()
        .map(|(id, mut result)| {
            let rrf_sum = *rrf_sums.get(&id).unwrap_or(&0.0);
            let vector_norm = *vector_norm_by_id.get(&id).unwrap_or(&0.0);
            let flags = boost_lookup(&result);
            let score = case_boost_score(rrf_sum, vector_norm, flags, config);
            result.metadata_mut().final_score = score;
            result.metadata_mut().vector_score = vector_norm;
            result
        })
        .collect();

    fused.sort_by(|a, b| b.final_score().partial_cmp(&a.final_score()).unwrap());
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rrf_contribution_decreases_with_rank() {
        let first = rrf_contribution(1, 60.0);
        let second = rrf_contribution(2, 60.0);
        assert!(first > second);
    }

    #[test]
    fn resolver_boosts_are_mutually_exclusive_highest_wins() {
        let config = RetrievalConfig::default();
        let flags = CaseBoostFlags {
            resolver_party: true,
            resolver_party_or: true,
            ..Default::default()
        };
        let with_both = case_boost_score(0.0, 0.0, flags, &config);
        let party_only = case_boost_score(
            0.0,
            0.0,
            CaseBoostFlags {
                resolver_party: true,
                ..Default::default()
            },
            &config,
        );
        assert_eq!(with_both, party_only);
    }

    #[test]
    fn minmax_normalize_handles_constant_input() {
        let norm = minmax_normalize(&[0.5, 0.5, 0.5]);
        assert_eq!(norm, vec![1.0, 1.0, 1.0]);
    }

    fn statute_result(id: &str, section_no: &str, score: f32) -> SearchResult {
        SearchResult::Statute {
            id: id.into(),
            similarity_score: score,
            content: "text".into(),
            metadata: legal_rag_core::ResultMetadata {
                section_no: Some(section_no.into()),
                ..Default::default()
            },
            authority_weight: 1.0,
        }
    }

    #[test]
    fn section_match_boost_applies_when_guess_matches() {
        let config = RetrievalConfig::default();
        let matching = fuse_statutes(
            vec![statute_result("a", "147", 0.5)],
            vec![],
            &["BNS:2023:Sec:147".to_string()],
            &config,
        );
        let non_matching = fuse_statutes(
            vec![statute_result("a", "147", 0.5)],
            vec![],
            &[],
            &config,
        );
        assert!(matching[0].final_score() > non_matching[0].final_score());
        assert!(
            (matching[0].final_score() - non_matching[0].final_score() - config.statute_section_match_boost).abs()
                < 1e-6
        );
    }
}
