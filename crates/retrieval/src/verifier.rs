//! Verifier.
//!
//! Runs after assembly and before a contract is returned to a caller.
//! Drops citations that don't resolve against the retrieved set, drops
//! quotes that don't substring-match the hydrated chunk they claim to
//! come from, and computes the confidence score from the weighted sum
//! `w_claims·claims + w_citations·citations + w_quotes·quotes +
//! w_rank·rank_quality` (weights from `RetrievalConfig`).
//!
//! This is the last of the `Received -> Analyzed -> Retrieved ->
//! Assembled -> Verified -> Emitted` pipeline stages; the contract this
//! function mutates is what gets emitted.

use std::collections::HashMap;

use legal_rag_config::RetrievalConfig;
use legal_rag_core::{AnswerContract, Confidence, SearchResult};

#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub confidence: Confidence,
    pub citations_dropped: usize,
    pub quotes_dropped: usize,
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        1.0
    } else {
        numerator as f32 / denominator as f32
    }
}

/// Verifies and finalizes an assembled `AnswerContract` in place, then
/// returns a summary of what was checked. `retrieved` must be the exact
/// ranked, hydrated result set the contract was assembled from — rank
/// position feeds the confidence formula's rank-quality term.
pub fn verify_answer(
    contract: &mut AnswerContract,
    retrieved: &[SearchResult],
    config: &RetrievalConfig,
) -> VerificationOutcome {
    let by_id: HashMap<&str, &SearchResult> =
        retrieved.iter().map(|r| (r.id(), r)).collect();
    let rank_of: HashMap<&str, usize> = retrieved
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id(), i))
        .collect();

    let citations_total = contract.statutes.len() + contract.cases.len();
    let mut citations_dropped = 0usize;
    let mut quotes_total = 0usize;
    let mut quotes_dropped = 0usize;

    contract.statutes.retain_mut(|statute| {
        let Some(result) = by_id.get(statute.id.as_str()) else {
            citations_dropped += 1;
            tracing::warn!(id = %statute.id, "dropped statute citation not in retrieved set");
            contract
                .warnings
                .push(format!("dropped unverifiable citation {}", statute.id));
            return false;
        };
        if let Some(quote) = &statute.quote {
            quotes_total += 1;
            if !normalize(result.content()).contains(&normalize(quote)) {
                quotes_dropped += 1;
                contract
                    .warnings
                    .push(format!("dropped unmatched quote for {}", statute.id));
                statute.quote = None;
            }
        }
        true
    });

    contract.cases.retain_mut(|case| {
        let Some(result) = by_id.get(case.id.as_str()) else {
            citations_dropped += 1;
            contract
                .warnings
                .push(format!("dropped unverifiable citation {}", case.id));
            return false;
        };
        if let Some(quote) = &case.quote {
            quotes_total += 1;
            if !normalize(result.content()).contains(&normalize(quote)) {
                quotes_dropped += 1;
                contract
                    .warnings
                    .push(format!("dropped unmatched quote for {}", case.id));
                case.quote = None;
            }
        }
        true
    });

    let surviving_ids: Vec<&str> = contract
        .statutes
        .iter()
        .map(|s| s.id.as_str())
        .chain(contract.cases.iter().map(|c| c.id.as_str()))
        .collect();

    let claims_total = contract.analysis.len();
    let mut claims_unsupported = 0usize;
    contract.analysis.retain(|entry| {
        let supported = surviving_ids
            .iter()
            .any(|id| entry.issue.contains(id) || entry.application.contains(id));
        if !supported {
            claims_unsupported += 1;
            contract
                .warnings
                .push(format!("dropped unsupported claim: {}", entry.issue));
        }
        supported
    });

    let rank_quality = {
        let top: Vec<f32> = surviving_ids
            .iter()
            .take(3)
            .filter_map(|id| rank_of.get(id))
            .map(|&rank| 1.0 / (1.0 + rank as f32))
            .collect();
        if top.is_empty() {
            0.0
        } else {
            top.iter().sum::<f32>() / top.len() as f32
        }
    };

    let claims_quality = ratio(claims_total - claims_unsupported, claims_total);
    let citations_quality = ratio(citations_total - citations_dropped, citations_total);
    let quotes_quality = ratio(quotes_total - quotes_dropped, quotes_total);

    let score = config.w_claims * claims_quality
        + config.w_citations * citations_quality
        + config.w_quotes * quotes_quality
        + config.w_rank * rank_quality;

    let mut reasons = Vec::new();
    if claims_total > 0 {
        reasons.push(format!(
            "{}/{} claims grounded in retrieved text",
            claims_total - claims_unsupported,
            claims_total
        ));
    }
    if citations_total > 0 {
        reasons.push(format!(
            "{}/{} citations resolved against the retrieved set",
            citations_total - citations_dropped,
            citations_total
        ));
    }
    if quotes_total > 0 {
        reasons.push(format!(
            "{}/{} quotes matched hydrated chunk text",
            quotes_total - quotes_dropped,
            quotes_total
        ));
    }

    contract.confidence = Confidence {
        score: score.clamp(0.0, 1.0),
        reasons,
    };

    VerificationOutcome {
        confidence: contract.confidence.clone(),
        citations_dropped,
        quotes_dropped,
    }
}
