//! Resolvers.
//!
//! Resolvers bypass semantic search entirely when the query names a
//! specific statute section, case party, citation, or document ID.
//! Their hits are marked in `ResultMetadata` so fusion can apply the
//! resolver bonus and MMR/cap logic can treat them consistently with
//! ranked candidates.

use legal_rag_core::{JudgmentChunk, ResultMetadata, SearchResult, StatuteChunk};

use crate::chunk_store::ChunkStore;
use crate::error::RetrievalError;

fn statute_to_result(chunk: StatuteChunk, similarity_score: f32, fallback_match: bool) -> SearchResult {
    let canonical_id = chunk.canonical_id();
    let metadata = ResultMetadata {
        doc_id: chunk.doc_id.clone(),
        section_no: Some(chunk.section_no.clone()),
        unit_type: Some(chunk.unit_type),
        canonical_id: Some(canonical_id),
        effective_from: chunk.effective_from,
        effective_to: chunk.effective_to,
        fallback_match,
        ..Default::default()
    };
    SearchResult::Statute {
        id: chunk.id,
        similarity_score,
        content: chunk.text,
        metadata,
        authority_weight: 1.0,
    }
}

fn case_to_result(chunk: JudgmentChunk, flag: CaseResolverFlag) -> SearchResult {
    let metadata = ResultMetadata {
        doc_id: chunk.doc_id.clone(),
        case_title: Some(chunk.case_title.clone()),
        decision_date: chunk.decision_date,
        bench: chunk.bench.clone(),
        citation_strings: chunk.citation_strings.clone(),
        para_range: chunk.para_range.clone(),
        party_resolver: matches!(flag, CaseResolverFlag::Party),
        party_resolver_or: matches!(flag, CaseResolverFlag::PartyOr),
        citation_resolver: matches!(flag, CaseResolverFlag::Citation),
        fallback_doc_match: matches!(flag, CaseResolverFlag::DocId),
        ..Default::default()
    };
    let authority_weight = if chunk.doc_id.starts_with("SC:") { 1.0 } else { 0.8 };
    SearchResult::Case {
        id: chunk.id,
        similarity_score: 0.0,
        content: chunk.text,
        metadata,
        authority_weight,
    }
}

#[derive(Debug, Clone, Copy)]
enum CaseResolverFlag {
    Party,
    PartyOr,
    Citation,
    DocId,
}

/// Looks up statute chunks by explicit section number. These bypass
/// similarity search entirely, so they're scored as exact matches
/// (`similarity_score=1.0`) and flagged `fallback_match=true` so
/// downstream consumers can tell a named-section hit apart from a
/// ranked one.
pub async fn resolve_statute_sections(
    store: &dyn ChunkStore,
    section_numbers: &[String],
) -> Result<Vec<SearchResult>, RetrievalError> {
    if section_numbers.is_empty() {
        return Ok(Vec::new());
    }
    let rows = store.statutes_by_section(section_numbers).await?;
    Ok(rows.into_iter().map(|c| statute_to_result(c, 1.0, true)).collect())
}

/// Resolves case mentions of the form `(party_a, party_b)`. Tries an
/// AND match (`title contains both parties`) first; if that returns
/// nothing, falls back to an OR match against each party independently
/// and marks the weaker bonus.
pub async fn resolve_case_parties(
    store: &dyn ChunkStore,
    case_mentions: &[(String, String)],
    limit_per_mention: usize,
) -> Result<Vec<SearchResult>, RetrievalError> {
    let mut results = Vec::new();
    for (party_a, party_b) in case_mentions {
        let a_lower = party_a.to_lowercase();
        let b_lower = party_b.to_lowercase();

        let by_a = store
            .cases_by_title_substring(&a_lower, limit_per_mention)
            .await?;
        let and_matches: Vec<JudgmentChunk> = by_a
            .iter()
            .filter(|c| c.case_title.to_lowercase().contains(&b_lower))
            .cloned()
            .collect();

        if !and_matches.is_empty() {
            results.extend(
                and_matches
                    .into_iter()
                    .map(|c| case_to_result(c, CaseResolverFlag::Party)),
            );
            continue;
        }

        let by_b = store
            .cases_by_title_substring(&b_lower, limit_per_mention)
            .await?;
        let mut seen_ids = std::collections::HashSet::new();
        for chunk in by_a.into_iter().chain(by_b.into_iter()) {
            if seen_ids.insert(chunk.id.clone()) {
                results.push(case_to_result(chunk, CaseResolverFlag::PartyOr));
            }
        }
    }
    Ok(results)
}

/// Resolves explicit citation strings (e.g. `AIR 2019 SC 123`) against
/// the case corpus's citation list.
pub async fn resolve_citations(
    store: &dyn ChunkStore,
    citation_hints: &[String],
    limit_per_hint: usize,
) -> Result<Vec<SearchResult>, RetrievalError> {
    let mut results = Vec::new();
    for hint in citation_hints {
        let rows = store
            .cases_by_citation_substring(&hint.to_lowercase(), limit_per_hint)
            .await?;
        results.extend(rows.into_iter().map(|c| case_to_result(c, CaseResolverFlag::Citation)));
    }
    Ok(results)
}

fn sanitize_query_tokens(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect()
}

fn keyword_hit_count(tokens: &[String], text: &str) -> usize {
    let lower = text.to_lowercase();
    tokens.iter().filter(|t| lower.contains(t.as_str())).count()
}

/// Resolves explicit `doc_id`-shaped case IDs (`SC:YYYY:NNN`) by pulling
/// every chunk belonging to that document, scoring each by the count of
/// sanitized query tokens it contains, and keeping the top
/// `limit_per_doc` positive-scoring chunks plus the last-ordered chunk
///.
pub async fn resolve_doc_ids(
    store: &dyn ChunkStore,
    doc_ids: &[String],
    query: &str,
    limit_per_doc: usize,
) -> Result<Vec<SearchResult>, RetrievalError> {
    let tokens = sanitize_query_tokens(query);
    let mut results = Vec::new();
    for doc_id in doc_ids {
        let rows = store.cases_by_doc_id(doc_id).await?;
        let Some(last_order) = rows.iter().map(|c| c.order).max() else {
            continue;
        };

        let mut scored: Vec<(usize, JudgmentChunk)> = rows
            .into_iter()
            .map(|c| (keyword_hit_count(&tokens, &c.text), c))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut picked_ids = std::collections::HashSet::new();
        for (hits, chunk) in scored.iter().take(limit_per_doc) {
            if *hits == 0 {
                continue;
            }
            picked_ids.insert(chunk.id.clone());
            let mut result = case_to_result(chunk.clone(), CaseResolverFlag::DocId);
            result
                .metadata_mut()
                .extensions
                .insert("keyword_hits".into(), serde_json::json!(hits));
            results.push(result);
        }
        if let Some((hits, chunk)) = scored.iter().find(|(_, c)| c.order == last_order) {
            if !picked_ids.contains(&chunk.id) {
                let mut result = case_to_result(chunk.clone(), CaseResolverFlag::DocId);
                result
                    .metadata_mut()
                    .extensions
                    .insert("keyword_hits".into(), serde_json::json!(hits));
                results.push(result);
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_store::InMemoryChunkStore;
    use legal_rag_core::{TokenCount, UnitType};

    fn statute(section_no: &str) -> StatuteChunk {
        StatuteChunk {
            id: format!("BNS:2023:chunk:{section_no}"),
            doc_id: "BNS:2023".into(),
            act: "BNS".into(),
            year: 2023,
            section_no: section_no.into(),
            unit_type: UnitType::Section,
            title: None,
            text: "Whoever commits robbery shall be punished.".into(),
            tokens: TokenCount::new(100).unwrap(),
            sha256: "x".into(),
            effective_from: None,
            effective_to: None,
            embedding: vec![],
        }
    }

    #[tokio::test]
    async fn resolve_statute_sections_marks_exact_similarity_and_fallback() {
        let store = InMemoryChunkStore::new(vec![statute("147")], vec![]);
        let results = resolve_statute_sections(&store, &["147".to_string()]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].similarity_score(), 1.0);
        assert!(results[0].metadata().fallback_match);
    }

    fn case(id: &str, title: &str, doc_id: &str) -> JudgmentChunk {
        JudgmentChunk {
            id: id.into(),
            doc_id: doc_id.into(),
            case_title: title.into(),
            decision_date: None,
            bench: vec![],
            citation_strings: vec!["AIR 2019 SC 123".into()],
            para_range: None,
            text: "judgment text".into(),
            tokens: TokenCount::new(100).unwrap(),
            overlap_tokens: 0,
            sha256: "abc".into(),
            embedding: vec![],
            order: 0,
        }
    }

    #[tokio::test]
    async fn resolves_party_and_match_before_or_fallback() {
        let store = InMemoryChunkStore::new(
            vec![],
            vec![case("c1", "State of Punjab v. Baldev Singh", "SC:2021:1")],
        );
        let mentions = vec![("State of Punjab".to_string(), "Baldev Singh".to_string())];
        let results = resolve_case_parties(&store, &mentions, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].metadata().party_resolver);
    }

    #[tokio::test]
    async fn falls_back_to_or_match_when_no_and_hit() {
        let store = InMemoryChunkStore::new(
            vec![],
            vec![
                case("c1", "State of Punjab v. Someone Else", "SC:2021:1"),
                case("c2", "Different Title v. Baldev Singh", "SC:2020:2"),
            ],
        );
        let mentions = vec![("State of Punjab".to_string(), "Baldev Singh".to_string())];
        let results = resolve_case_parties(&store, &mentions, 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.metadata().party_resolver_or));
    }
}
