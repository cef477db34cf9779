//! Tunables for the hybrid retrieval engine, the answer assembler, and the
//! cache layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_statute_k")]
    pub statute_k: usize,
    #[serde(default = "default_case_k")]
    pub case_k: usize,
    #[serde(default = "default_case_ann_k")]
    pub case_ann_k: usize,
    #[serde(default = "default_case_bm25_k")]
    pub case_bm25_k: usize,

    // Statute fusion weights.
    #[serde(default = "default_statute_vector_weight")]
    pub statute_vector_weight: f32,
    #[serde(default = "default_statute_keyword_weight")]
    pub statute_keyword_weight: f32,
    #[serde(default = "default_statute_recency_weight")]
    pub statute_recency_weight: f32,
    #[serde(default = "default_statute_authority_weight")]
    pub statute_authority_weight: f32,
    #[serde(default = "default_statute_section_match_boost")]
    pub statute_section_match_boost: f32,
    #[serde(default = "default_statute_canonical_match_boost")]
    pub statute_canonical_match_boost: f32,

    // Case fusion (RRF + boosts).
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
    #[serde(default = "default_case_vector_weight")]
    pub case_vector_weight: f32,
    #[serde(default = "default_case_authority_boost")]
    pub case_authority_boost: f32,
    #[serde(default = "default_case_recency_boost")]
    pub case_recency_boost: f32,
    #[serde(default = "default_case_recency_years")]
    pub case_recency_years: i32,
    #[serde(default = "default_case_topical_boost_one")]
    pub case_topical_boost_one: f32,
    #[serde(default = "default_case_topical_boost_two")]
    pub case_topical_boost_two: f32,
    #[serde(default = "default_case_bridge_boost")]
    pub case_bridge_boost: f32,
    #[serde(default = "default_resolver_party_boost")]
    pub resolver_party_boost: f32,
    #[serde(default = "default_resolver_party_or_boost")]
    pub resolver_party_or_boost: f32,
    #[serde(default = "default_resolver_other_boost")]
    pub resolver_other_boost: f32,

    // Cross-encoder rerank.
    #[serde(default = "default_true")]
    pub reranking_enabled: bool,
    #[serde(default = "default_ce_weight")]
    pub ce_weight: f32,
    #[serde(default = "default_ce_current_weight")]
    pub ce_current_weight: f32,
    #[serde(default = "default_ce_max_candidates")]
    pub ce_max_candidates: usize,

    // MMR diversification.
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
    #[serde(default = "default_case_doc_cap")]
    pub case_doc_cap: usize,

    // Lexical search soft boosts.
    #[serde(default = "default_party_title_bonus")]
    pub party_title_bonus: f32,
    #[serde(default = "default_citation_hint_bonus")]
    pub citation_hint_bonus: f32,
    #[serde(default = "default_issue_terms_cap")]
    pub issue_terms_cap: usize,
    #[serde(default = "default_fallback_doc_limit_per_doc")]
    pub fallback_doc_limit_per_doc: usize,

    // Timeouts (milliseconds).
    #[serde(default = "default_embedding_timeout_ms")]
    pub embedding_timeout_ms: u64,
    #[serde(default = "default_ann_timeout_ms")]
    pub ann_timeout_ms: u64,
    #[serde(default = "default_lexical_timeout_ms")]
    pub lexical_timeout_ms: u64,
    #[serde(default = "default_reranker_timeout_ms")]
    pub reranker_timeout_ms: u64,
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,

    // Answer assembler.
    #[serde(default = "default_context_token_budget")]
    pub context_token_budget: usize,
    #[serde(default = "default_response_reserve_fraction")]
    pub response_reserve_fraction: f32,
    #[serde(default = "default_quote_max_chars")]
    pub quote_max_chars: usize,

    // Verifier confidence weights.
    #[serde(default = "default_w_claims")]
    pub w_claims: f32,
    #[serde(default = "default_w_citations")]
    pub w_citations: f32,
    #[serde(default = "default_w_quotes")]
    pub w_quotes: f32,
    #[serde(default = "default_w_rank")]
    pub w_rank: f32,

    // Cache TTLs (seconds).
    #[serde(default = "default_embedding_cache_ttl_secs")]
    pub embedding_cache_ttl_secs: u64,
    #[serde(default = "default_result_cache_ttl_secs")]
    pub result_cache_ttl_secs: u64,
    #[serde(default = "default_core_doc_ttl_multiplier")]
    pub core_doc_ttl_multiplier: u64,
    #[serde(default = "default_in_process_lru_capacity")]
    pub in_process_lru_capacity: usize,
}

fn default_statute_k() -> usize {
    8
}
fn default_case_k() -> usize {
    8
}
fn default_case_ann_k() -> usize {
    320
}
fn default_case_bm25_k() -> usize {
    140
}
fn default_statute_vector_weight() -> f32 {
    0.6
}
fn default_statute_keyword_weight() -> f32 {
    0.25
}
fn default_statute_recency_weight() -> f32 {
    0.1
}
fn default_statute_authority_weight() -> f32 {
    0.05
}
fn default_statute_section_match_boost() -> f32 {
    0.15
}
fn default_statute_canonical_match_boost() -> f32 {
    0.25
}
fn default_rrf_k() -> f32 {
    60.0
}
fn default_case_vector_weight() -> f32 {
    0.20
}
fn default_case_authority_boost() -> f32 {
    0.15
}
fn default_case_recency_boost() -> f32 {
    0.05
}
fn default_case_recency_years() -> i32 {
    10
}
fn default_case_topical_boost_one() -> f32 {
    0.10
}
fn default_case_topical_boost_two() -> f32 {
    0.05
}
fn default_case_bridge_boost() -> f32 {
    0.20
}
fn default_resolver_party_boost() -> f32 {
    0.25
}
fn default_resolver_party_or_boost() -> f32 {
    0.10
}
fn default_resolver_other_boost() -> f32 {
    0.20
}
fn default_true() -> bool {
    true
}
fn default_ce_weight() -> f32 {
    0.35
}
fn default_ce_current_weight() -> f32 {
    0.65
}
fn default_ce_max_candidates() -> usize {
    50
}
fn default_mmr_lambda() -> f32 {
    0.7
}
fn default_case_doc_cap() -> usize {
    3
}
fn default_party_title_bonus() -> f32 {
    0.05
}
fn default_citation_hint_bonus() -> f32 {
    0.05
}
fn default_issue_terms_cap() -> usize {
    40
}
fn default_fallback_doc_limit_per_doc() -> usize {
    3
}
fn default_embedding_timeout_ms() -> u64 {
    10_000
}
fn default_ann_timeout_ms() -> u64 {
    2_000
}
fn default_lexical_timeout_ms() -> u64 {
    2_000
}
fn default_reranker_timeout_ms() -> u64 {
    3_000
}
fn default_request_deadline_ms() -> u64 {
    8_000
}
fn default_context_token_budget() -> usize {
    12_000
}
fn default_response_reserve_fraction() -> f32 {
    0.25
}
fn default_quote_max_chars() -> usize {
    300
}
fn default_w_claims() -> f32 {
    0.35
}
fn default_w_citations() -> f32 {
    0.30
}
fn default_w_quotes() -> f32 {
    0.20
}
fn default_w_rank() -> f32 {
    0.15
}
fn default_embedding_cache_ttl_secs() -> u64 {
    86_400
}
fn default_result_cache_ttl_secs() -> u64 {
    3_600
}
fn default_core_doc_ttl_multiplier() -> u64 {
    7
}
fn default_in_process_lru_capacity() -> usize {
    50_000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            statute_k: default_statute_k(),
            case_k: default_case_k(),
            case_ann_k: default_case_ann_k(),
            case_bm25_k: default_case_bm25_k(),
            statute_vector_weight: default_statute_vector_weight(),
            statute_keyword_weight: default_statute_keyword_weight(),
            statute_recency_weight: default_statute_recency_weight(),
            statute_authority_weight: default_statute_authority_weight(),
            statute_section_match_boost: default_statute_section_match_boost(),
            statute_canonical_match_boost: default_statute_canonical_match_boost(),
            rrf_k: default_rrf_k(),
            case_vector_weight: default_case_vector_weight(),
            case_authority_boost: default_case_authority_boost(),
            case_recency_boost: default_case_recency_boost(),
            case_recency_years: default_case_recency_years(),
            case_topical_boost_one: default_case_topical_boost_one(),
            case_topical_boost_two: default_case_topical_boost_two(),
            case_bridge_boost: default_case_bridge_boost(),
            resolver_party_boost: default_resolver_party_boost(),
            resolver_party_or_boost: default_resolver_party_or_boost(),
            resolver_other_boost: default_resolver_other_boost(),
            reranking_enabled: default_true(),
            ce_weight: default_ce_weight(),
            ce_current_weight: default_ce_current_weight(),
            ce_max_candidates: default_ce_max_candidates(),
            mmr_lambda: default_mmr_lambda(),
            case_doc_cap: default_case_doc_cap(),
            party_title_bonus: default_party_title_bonus(),
            citation_hint_bonus: default_citation_hint_bonus(),
            issue_terms_cap: default_issue_terms_cap(),
            fallback_doc_limit_per_doc: default_fallback_doc_limit_per_doc(),
            embedding_timeout_ms: default_embedding_timeout_ms(),
            ann_timeout_ms: default_ann_timeout_ms(),
            lexical_timeout_ms: default_lexical_timeout_ms(),
            reranker_timeout_ms: default_reranker_timeout_ms(),
            request_deadline_ms: default_request_deadline_ms(),
            context_token_budget: default_context_token_budget(),
            response_reserve_fraction: default_response_reserve_fraction(),
            quote_max_chars: default_quote_max_chars(),
            w_claims: default_w_claims(),
            w_citations: default_w_citations(),
            w_quotes: default_w_quotes(),
            w_rank: default_w_rank(),
            embedding_cache_ttl_secs: default_embedding_cache_ttl_secs(),
            result_cache_ttl_secs: default_result_cache_ttl_secs(),
            core_doc_ttl_multiplier: default_core_doc_ttl_multiplier(),
            in_process_lru_capacity: default_in_process_lru_capacity(),
        }
    }
}
