//! Hybrid Retrieval Engine orchestration.
//!
//! Fans out dense and sparse search for both statutes and cases,
//! resolves any explicit sections/parties/citations/doc IDs named in
//! the query, fuses everything into one ranked list per result type,
//! reranks cases with the cross-encoder, diversifies with MMR, and
//! enforces the per-document cap. A query whose `SC:`-only search
//! comes back empty is retried once with the case-source filter
//! widened to non-Supreme-Court judgments, marking every hit from that
//! retry pass as a fallback match.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use legal_rag_config::{LegacyMappingTable, RetrievalConfig};
use legal_rag_core::{DateSource, QueryAnalysis, SearchResult, TemporalContext};

use crate::assembler::{assemble_answer, AnswerMode, AssemblerInput};
use crate::cache::TieredCache;
use crate::chunk_store::{CaseFilter, ChunkStore, StatuteFilter};
use crate::embeddings::EmbeddingClient;
use crate::error::RetrievalError;
use crate::fusion::{fuse_cases, fuse_statutes, CaseBoostFlags};
use crate::mmr::mmr_select;
use crate::query_analysis::analyze_query;
use crate::reranker::CrossEncoderReranker;
use crate::resolvers::{resolve_case_parties, resolve_citations, resolve_doc_ids, resolve_statute_sections};
use crate::temporal::{
    attach_legacy_mappings, case_passes_validity, resolve_temporal_context, statute_passes_validity, today,
};
use crate::verifier::verify_answer;

/// Supreme Court doc-id prefix; the first case search pass is
/// restricted to it, with a fallback-widened retry on empty results.
const SC_PREFIX: &str = "SC:";

pub struct HybridRetrievalEngine {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingClient>,
    reranker: Option<Arc<CrossEncoderReranker>>,
    cache: Option<Arc<TieredCache>>,
    config: RetrievalConfig,
    legacy_mappings: LegacyMappingTable,
}

/// Output of a full search: the query analysis (useful to the caller
/// for building the `AnswerContract`'s warnings) plus the final,
/// capped, diversified candidate list.
pub struct RetrievalOutcome {
    pub analysis: QueryAnalysis,
    pub results: Vec<SearchResult>,
}

impl HybridRetrievalEngine {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingClient>,
        reranker: Option<Arc<CrossEncoderReranker>>,
        cache: Option<Arc<TieredCache>>,
        config: RetrievalConfig,
        legacy_mappings: LegacyMappingTable,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            cache,
            config,
            legacy_mappings,
        }
    }

    pub async fn search(
        &self,
        query: &str,
        as_on_override: Option<NaiveDate>,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let analysis = analyze_query(query);
        let temporal = resolve_temporal_context(query, today());
        let as_on_date = as_on_override.unwrap_or(temporal.as_on_date);

        let query_embedding = self
            .embedder
            .embed_one(query)
            .await
            .map_err(RetrievalError::from)?;
        let query_tokens: Vec<String> = analysis
            .legal_terms
            .iter()
            .chain(analysis.expanded_terms.values().flatten())
            .cloned()
            .collect();

        let statute_filter = StatuteFilter {
            act: None,
            as_on_date: Some(as_on_date),
        };

        let (statute_vec, statute_kw, resolved_sections) = tokio::try_join!(
            self.store
                .ann_statutes(&query_embedding, self.config.statute_k, &statute_filter),
            self.store
                .lexical_statutes(&query_tokens, self.config.statute_k, &statute_filter),
            resolve_statute_sections(self.store.as_ref(), &analysis.explicit_sections),
        )?;

        let statute_vec = to_search_results_statutes(statute_vec);
        let statute_kw = to_search_results_statutes(statute_kw);
        let mut statutes = fuse_statutes(statute_vec, statute_kw, &analysis.section_guesses, &self.config);
        for result in statutes.iter_mut() {
            if let Some(section_no) = result.metadata().section_no.clone() {
                attach_legacy_mappings(result.metadata_mut(), &section_no, &self.legacy_mappings);
            }
        }
        let resolved_sections: Vec<SearchResult> = resolved_sections
            .into_iter()
            .filter(|r| statute_passes_validity(r.metadata().effective_from, r.metadata().effective_to, as_on_date))
            .collect();
        statutes.extend(boost_resolved_sections(resolved_sections, &self.config));
        dedup_by_id(&mut statutes);
        statutes.sort_by(|a, b| b.final_score().partial_cmp(&a.final_score()).unwrap());
        statutes.truncate(self.config.statute_k);

        let mut cases = self
            .search_cases(query, &query_embedding, &query_tokens, &analysis, as_on_date, false)
            .await?;
        if cases.is_empty() {
            tracing::debug!("no Supreme Court hits, widening case search to all courts");
            cases = self
                .search_cases(query, &query_embedding, &query_tokens, &analysis, as_on_date, true)
                .await?;
        }

        if let Some(reranker) = &self.reranker {
            if self.config.reranking_enabled {
                cases = reranker
                    .rerank(query, cases, self.config.ce_max_candidates)
                    .await;
            }
        }

        let diversified_statutes = mmr_select(statutes, self.config.statute_k, self.config.mmr_lambda);
        let diversified_cases = mmr_select(cases, self.config.case_k, self.config.mmr_lambda);
        let capped_cases = enforce_case_doc_cap(diversified_cases, self.config.case_doc_cap);

        let mut results = diversified_statutes;
        results.extend(capped_cases);

        self.hydrate(&mut results).await?;

        Ok(RetrievalOutcome { analysis, results })
    }

    /// Runs the full `Received -> Analyzed -> Retrieved -> Assembled ->
    /// Verified -> Emitted` pipeline: searches, assembles the answer
    /// contract from the ranked set, then verifies citations/quotes/
    /// claims against that same set before returning.
    pub async fn answer(
        &self,
        query: &str,
        as_on_override: Option<NaiveDate>,
        mode: AnswerMode,
    ) -> Result<legal_rag_core::AnswerContract, RetrievalError> {
        let outcome = self.search(query, as_on_override).await?;
        let temporal = resolve_temporal_context(query, today());
        let temporal = as_on_override
            .map(|d| TemporalContext {
                as_on_date: d,
                date_source: DateSource::Explicit,
                confidence: temporal.confidence,
            })
            .unwrap_or(temporal);

        let input = AssemblerInput {
            query,
            analysis: &outcome.analysis,
            temporal: &temporal,
            results: &outcome.results,
            mode,
        };
        let mut contract = assemble_answer(input, &self.config);
        verify_answer(&mut contract, &outcome.results, &self.config);
        Ok(contract)
    }

    /// Fetches full `text` for the final ranked IDs. Search-adapter content is already the chunk text for the
    /// in-memory reference store, but a production store may return
    /// truncated snippets from ANN/lexical search, so this step is not
    /// skippable.
    async fn hydrate(&self, results: &mut [SearchResult]) -> Result<(), RetrievalError> {
        let statute_ids: Vec<String> = results
            .iter()
            .filter(|r| r.is_statute())
            .map(|r| r.id().to_string())
            .collect();
        let case_ids: Vec<String> = results
            .iter()
            .filter(|r| r.is_case())
            .map(|r| r.id().to_string())
            .collect();

        let (statute_text, case_text) = tokio::try_join!(
            self.store.hydrate_statutes(&statute_ids),
            self.store.hydrate_cases(&case_ids),
        )?;

        for result in results.iter_mut() {
            let hydrated = if result.is_statute() {
                statute_text.get(result.id())
            } else {
                case_text.get(result.id())
            };
            if let Some(text) = hydrated {
                result.set_content(text.clone());
            }
        }
        Ok(())
    }

    async fn search_cases(
        &self,
        query: &str,
        query_embedding: &[f32],
        query_tokens: &[String],
        analysis: &QueryAnalysis,
        as_on_date: NaiveDate,
        widen_fallback: bool,
    ) -> Result<Vec<SearchResult>, RetrievalError> {
        let filter = CaseFilter {
            doc_id_prefix: if widen_fallback { None } else { Some(SC_PREFIX.to_string()) },
            decision_date_to: Some(as_on_date),
        };

        let (ann_hits, kw_hits, party_hits, citation_hits, doc_hits) = tokio::try_join!(
            self.store
                .ann_cases(query_embedding, self.config.case_ann_k, &filter),
            self.store
                .lexical_cases(query_tokens, self.config.case_bm25_k, &filter),
            resolve_case_parties(self.store.as_ref(), &analysis.case_mentions, 20),
            resolve_citations(self.store.as_ref(), &extract_citation_strings(query), 20),
            resolve_doc_ids(
                self.store.as_ref(),
                &analysis.explicit_case_ids,
                query,
                self.config.fallback_doc_limit_per_doc,
            ),
        )?;

        let ann_results = to_search_results_cases(ann_hits);
        let kw_results = to_search_results_cases(kw_hits);

        let synonym_tokens: Vec<String> = analysis
            .expanded_terms
            .values()
            .flatten()
            .cloned()
            .collect();
        let statute_markers = extract_statute_markers(query);

        let mut fused = fuse_cases(
            vec![ann_results, kw_results],
            |result| {
                let topical_hits = count_topical_hits(result.content(), &synonym_tokens);
                CaseBoostFlags {
                    authority: result.doc_id().starts_with(SC_PREFIX),
                    recency: is_recent(result, as_on_date, self.config.case_recency_years),
                    topical_one: topical_hits == 1,
                    topical_two: topical_hits >= 2,
                    statute_bridge: statute_bridge_matches(result.content(), &statute_markers),
                    resolver_party: result.metadata().party_resolver,
                    resolver_party_or: result.metadata().party_resolver_or,
                    resolver_other: result.metadata().citation_resolver || result.metadata().fallback_doc_match,
                }
            },
            &self.config,
        );

        fused.extend(party_hits);
        fused.extend(citation_hits);
        fused.extend(doc_hits);

        if widen_fallback {
            for result in fused.iter_mut() {
                result.metadata_mut().fallback_match = true;
            }
        }

        fused.retain(|r| case_passes_validity(r.metadata().decision_date, as_on_date));
        dedup_by_id(&mut fused);
        fused.sort_by(|a, b| b.final_score().partial_cmp(&a.final_score()).unwrap());
        fused.truncate(self.config.case_k.max(self.config.ce_max_candidates));
        Ok(fused)
    }
}

fn to_search_results_statutes(
    scored: Vec<crate::chunk_store::ScoredStatute>,
) -> Vec<SearchResult> {
    scored
        .into_iter()
        .map(|s| {
            let chunk = s.chunk;
            let canonical_id = chunk.canonical_id();
            let metadata = legal_rag_core::ResultMetadata {
                doc_id: chunk.doc_id.clone(),
                section_no: Some(chunk.section_no.clone()),
                unit_type: Some(chunk.unit_type),
                canonical_id: Some(canonical_id),
                effective_from: chunk.effective_from,
                effective_to: chunk.effective_to,
                ..Default::default()
            };
            SearchResult::Statute {
                id: chunk.id,
                similarity_score: s.score,
                content: chunk.text,
                metadata,
                authority_weight: 1.0,
            }
        })
        .collect()
}

fn to_search_results_cases(scored: Vec<crate::chunk_store::ScoredCase>) -> Vec<SearchResult> {
    scored
        .into_iter()
        .map(|s| {
            let chunk = s.chunk;
            let authority_weight = if chunk.doc_id.starts_with(SC_PREFIX) { 1.0 } else { 0.8 };
            let metadata = legal_rag_core::ResultMetadata {
                doc_id: chunk.doc_id.clone(),
                case_title: Some(chunk.case_title.clone()),
                decision_date: chunk.decision_date,
                bench: chunk.bench.clone(),
                citation_strings: chunk.citation_strings.clone(),
                para_range: chunk.para_range.clone(),
                ..Default::default()
            };
            SearchResult::Case {
                id: chunk.id,
                similarity_score: s.score,
                content: chunk.text,
                metadata,
                authority_weight,
            }
        })
        .collect()
}

fn boost_resolved_sections(resolved: Vec<SearchResult>, config: &RetrievalConfig) -> Vec<SearchResult> {
    resolved
        .into_iter()
        .map(|mut r| {
            r.metadata_mut().final_score += config.statute_canonical_match_boost;
            r
        })
        .collect()
}

fn is_recent(result: &SearchResult, as_on_date: NaiveDate, window_years: i32) -> bool {
    match result.metadata().decision_date {
        Some(decided) => (as_on_date.year() - decided.year()) <= window_years,
        None => false,
    }
}

fn extract_citation_strings(query: &str) -> Vec<String> {
    crate::query_analysis::extract_citation_hints(query)
}

/// Counts how many distinct expanded-synonym tokens appear in a
/// candidate's content, for the topical boost.
fn count_topical_hits(content: &str, synonym_tokens: &[String]) -> usize {
    let lower = content.to_lowercase();
    let mut seen = std::collections::HashSet::new();
    for token in synonym_tokens {
        let token_lower = token.to_lowercase();
        if lower.contains(&token_lower) {
            seen.insert(token_lower);
        }
    }
    seen.len()
}

static STATUTE_MARKER_REGEX: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
    regex::Regex::new(r"(?i)\b(?:section\s+\d+[a-z]?|article\s+\d+[a-z]?|\d+[a-z]?\s*(?:crpc|ipc|bns|bnss|bsa))\b")
        .unwrap()
});

/// Extracts statute markers (e.g. "section 482", "65b", "Article 21")
/// from a query for the statute-to-case bridge boost.
fn extract_statute_markers(query: &str) -> Vec<String> {
    STATUTE_MARKER_REGEX
        .find_iter(query)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

fn statute_bridge_matches(content: &str, markers: &[String]) -> bool {
    if markers.is_empty() {
        return false;
    }
    let lower = content.to_lowercase();
    markers.iter().any(|marker| lower.contains(marker.as_str()))
}

fn dedup_by_id(results: &mut Vec<SearchResult>) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<SearchResult> = Vec::with_capacity(results.len());
    for result in results.drain(..) {
        if let Some(&idx) = seen.get(result.id()) {
            if result.final_score() > kept[idx].final_score() {
                kept[idx] = result;
            }
        } else {
            seen.insert(result.id().to_string(), kept.len());
            kept.push(result);
        }
    }
    *results = kept;
}

fn enforce_case_doc_cap(results: Vec<SearchResult>, cap: usize) -> Vec<SearchResult> {
    let mut per_doc: HashMap<String, usize> = HashMap::new();
    results
        .into_iter()
        .filter(|r| {
            if r.is_statute() {
                return true;
            }
            let count = per_doc.entry(r.doc_id().to_string()).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}
