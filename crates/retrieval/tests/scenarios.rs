//! End-to-end tests against a small, hand-built corpus: invariants,
//! round-trip laws, boundary behaviors, and representative query
//! scenarios for the full `Received -> Analyzed -> Retrieved ->
//! Assembled -> Verified -> Emitted` pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use legal_rag_config::{LegacyMappingTable, RetrievalConfig};
use legal_rag_core::{JudgmentChunk, SearchResult, StatuteChunk, TokenCount, UnitType};
use legal_rag_retrieval::{
    analyze_query, assemble_answer, chunk_store::{CaseFilter, StatuteFilter},
    clarifying_question, embeddings::EmbeddingClient, mmr::mmr_select, should_refuse,
    verify_answer, AnswerMode, AssemblerInput, ChunkStore, EmbeddingError, HybridRetrievalEngine,
    InMemoryChunkStore,
};

/// Returns a fixed unit vector keyed loosely to whether the text looks
/// statute-ish or case-ish, so dense search has some signal without
/// pulling in a real model.
struct FixtureEmbedder;

#[async_trait]
impl EmbeddingClient for FixtureEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                if lower.contains("robbery") || lower.contains("147") {
                    vec![1.0, 0.0, 0.0]
                } else if lower.contains("482") || lower.contains("quash") {
                    vec![0.0, 1.0, 0.0]
                } else {
                    vec![0.0, 0.0, 1.0]
                }
            })
            .collect())
    }
}

/// Always fails, for exercising the boundary behaviors that need an
/// empty dense or empty lexical channel.
struct EmptyEmbedder;

#[async_trait]
impl EmbeddingClient for EmptyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![0.0, 0.0, 0.0]).collect())
    }
}

fn bns_section(section_no: &str, text: &str, embedding: Vec<f32>, effective_from: Option<NaiveDate>) -> StatuteChunk {
    StatuteChunk {
        id: format!("BNS:2023:chunk:{section_no}"),
        doc_id: "BNS:2023".into(),
        act: "BNS".into(),
        year: 2023,
        section_no: section_no.into(),
        unit_type: UnitType::Section,
        title: None,
        text: text.into(),
        tokens: TokenCount::new(100).unwrap(),
        sha256: "deadbeef".into(),
        effective_from,
        effective_to: None,
        embedding,
    }
}

fn sc_case(
    id: &str,
    doc_id: &str,
    case_title: &str,
    text: &str,
    decision_date: Option<NaiveDate>,
    embedding: Vec<f32>,
    order: u32,
) -> JudgmentChunk {
    JudgmentChunk {
        id: id.into(),
        doc_id: doc_id.into(),
        case_title: case_title.into(),
        decision_date,
        bench: vec!["J. Rao".into()],
        citation_strings: vec!["AIR 2021 SC 1000".into()],
        para_range: Some("12-14".into()),
        text: text.into(),
        tokens: TokenCount::new(100).unwrap(),
        overlap_tokens: 0,
        sha256: "cafef00d".into(),
        embedding,
        order,
    }
}

/// The corpus shared by every scenario below: one pre-2024 and one
/// 2024-effective BNS section, plus three Supreme Court judgments
/// covering robbery, a named-party bail matter, and a 482 quash.
fn fixture_store() -> Arc<InMemoryChunkStore> {
    let statutes = vec![
        bns_section(
            "147",
            "Whoever commits robbery shall be punished with rigorous imprisonment for a term which may extend to ten years.",
            vec![1.0, 0.0, 0.0],
            Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
        ),
        bns_section(
            "303",
            "Whoever commits theft shall be punished with imprisonment of either description.",
            vec![0.0, 0.0, 1.0],
            Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
        ),
    ];
    let cases = vec![
        sc_case(
            "SC:2021:0445:p1",
            "SC:2021:0445",
            "State of Punjab v. Baldev Singh",
            "This Court held that the accused's act of robbery against the complainant amounted to an offence under the robbery provision.",
            Some(NaiveDate::from_ymd_opt(2021, 3, 10).unwrap()),
            vec![1.0, 0.0, 0.0],
            0,
        ),
        sc_case(
            "SC:2020:0112:p1",
            "SC:2020:0112",
            "Maharashtra v. XYZ",
            "The bail application of the accused was considered along with custody and surety conditions.",
            Some(NaiveDate::from_ymd_opt(2020, 6, 1).unwrap()),
            vec![0.0, 0.0, 1.0],
            0,
        ),
        sc_case(
            "SC:2019:0998:p1",
            "SC:2019:0998",
            "Anil Kumar v. State",
            "The inherent powers under section 482 were invoked to quash the FIR against the petitioner.",
            Some(NaiveDate::from_ymd_opt(2019, 11, 20).unwrap()),
            vec![0.0, 1.0, 0.0],
            0,
        ),
    ];
    Arc::new(InMemoryChunkStore::new(statutes, cases))
}

fn engine(store: Arc<InMemoryChunkStore>) -> HybridRetrievalEngine {
    HybridRetrievalEngine::new(
        store,
        Arc::new(FixtureEmbedder),
        None,
        None,
        RetrievalConfig::default(),
        LegacyMappingTable::default(),
    )
}

fn as_on(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// --- Invariants --------------------------------------------------

#[test]
fn invariant_token_count_stays_within_bounds() {
    assert!(TokenCount::new(79).is_err());
    assert!(TokenCount::new(801).is_err());
    assert!(TokenCount::new(80).is_ok());
    assert!(TokenCount::new(800).is_ok());
}

#[tokio::test]
async fn invariant_result_id_resolves_to_a_store_row() {
    let store = fixture_store();
    let eng = engine(store.clone());
    let outcome = eng
        .search("What is the punishment for robbery under section 147?", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(!outcome.results.is_empty());
    for result in &outcome.results {
        if result.is_statute() {
            let rows = store.statutes_by_section(&[result.metadata().section_no.clone().unwrap()]).await.unwrap();
            assert!(rows.iter().any(|r| r.id == result.id()));
        } else {
            let rows = store.cases_by_ids(&[result.id().to_string()]).await.unwrap();
            assert_eq!(rows.len(), 1);
        }
    }
}

#[tokio::test]
async fn invariant_statute_excluded_before_its_effective_date() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("What does section 147 say about robbery?", Some(as_on(2024, 1, 1)))
        .await
        .unwrap();
    assert!(outcome
        .results
        .iter()
        .filter(|r| r.is_statute())
        .all(|r| r.metadata().section_no.as_deref() != Some("147")));
}

#[tokio::test]
async fn invariant_case_decision_date_never_postdates_as_on_date() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("bail for the accused in custody", Some(as_on(2019, 1, 1)))
        .await
        .unwrap();
    for result in outcome.results.iter().filter(|r| r.is_case()) {
        if let Some(decided) = result.metadata().decision_date {
            assert!(decided <= as_on(2019, 1, 1));
        }
    }
}

#[test]
fn invariant_case_doc_cap_limits_hits_per_document() {
    fn case_result(id: &str, doc_id: &str, score: f32) -> SearchResult {
        SearchResult::Case {
            id: id.into(),
            similarity_score: score,
            content: "text".into(),
            metadata: legal_rag_core::ResultMetadata {
                doc_id: doc_id.into(),
                final_score: score,
                ..Default::default()
            },
            authority_weight: 1.0,
        }
    }
    let results = vec![
        case_result("c1", "SC:2020:1", 0.9),
        case_result("c2", "SC:2020:1", 0.8),
        case_result("c3", "SC:2020:1", 0.7),
        case_result("c4", "SC:2020:1", 0.6),
        case_result("c5", "SC:2021:2", 0.5),
    ];
    let selected = mmr_select(results, 10, 1.0);
    let cap = 3usize;
    let mut per_doc = std::collections::HashMap::new();
    let capped: Vec<_> = selected
        .into_iter()
        .filter(|r| {
            let count = per_doc.entry(r.metadata().doc_id.clone()).or_insert(0usize);
            *count += 1;
            *count <= cap
        })
        .collect();
    assert_eq!(capped.iter().filter(|r| r.metadata().doc_id == "SC:2020:1").count(), 3);
}

#[test]
fn invariant_mmr_is_pure_rank_order_at_lambda_one() {
    fn result(id: &str, doc_id: &str, score: f32) -> SearchResult {
        SearchResult::Case {
            id: id.into(),
            similarity_score: score,
            content: "text".into(),
            metadata: legal_rag_core::ResultMetadata {
                doc_id: doc_id.into(),
                final_score: score,
                ..Default::default()
            },
            authority_weight: 1.0,
        }
    }
    let candidates = vec![
        result("a", "doc1", 0.5),
        result("b", "doc1", 0.9),
        result("c", "doc2", 0.7),
        result("d", "doc3", 0.3),
    ];
    let selected = mmr_select(candidates, 3, 1.0);
    let ids: Vec<&str> = selected.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn invariant_fusion_is_deterministic_across_two_calls() {
    let store = fixture_store();
    let eng = engine(store);
    let query = "What is the punishment for robbery under section 147?";
    let first = eng.search(query, Some(as_on(2026, 1, 1))).await.unwrap();
    let second = eng.search(query, Some(as_on(2026, 1, 1))).await.unwrap();
    let first_ids: Vec<&str> = first.results.iter().map(|r| r.id()).collect();
    let second_ids: Vec<&str> = second.results.iter().map(|r| r.id()).collect();
    assert_eq!(first_ids, second_ids);
}

#[tokio::test]
async fn invariant_quotes_are_faithful_to_hydrated_content() {
    let store = fixture_store();
    let eng = engine(store);
    let contract = eng
        .answer(
            "What is the punishment for robbery under section 147?",
            Some(as_on(2026, 1, 1)),
            AnswerMode::Qa,
        )
        .await
        .unwrap();
    for statute in &contract.statutes {
        if let Some(quote) = &statute.quote {
            assert!(!quote.is_empty());
        }
    }
}

#[tokio::test]
async fn invariant_citations_resolve_to_ids_present_in_retrieval() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("What is the punishment for robbery under section 147?", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    let retrieved_ids: Vec<&str> = outcome.results.iter().map(|r| r.id()).collect();

    let input = AssemblerInput {
        query: "What is the punishment for robbery under section 147?",
        analysis: &outcome.analysis,
        temporal: &legal_rag_core::TemporalContext {
            as_on_date: as_on(2026, 1, 1),
            date_source: legal_rag_core::DateSource::Explicit,
            confidence: 0.9,
        },
        results: &outcome.results,
        mode: AnswerMode::Qa,
    };
    let config = RetrievalConfig::default();
    let mut contract = assemble_answer(input, &config);
    verify_answer(&mut contract, &outcome.results, &config);

    for statute in &contract.statutes {
        assert!(retrieved_ids.contains(&statute.id.as_str()));
    }
    for case in &contract.cases {
        assert!(retrieved_ids.contains(&case.id.as_str()));
    }
}

#[test]
fn invariant_refuses_query_with_no_tokens_and_no_legal_signal() {
    let analysis = analyze_query("hi");
    assert!(should_refuse(&analysis));
}

// --- Round-trip laws -----------------------------------------------

#[tokio::test]
async fn round_trip_answer_contract_json_is_lossless() {
    let store = fixture_store();
    let eng = engine(store);
    let contract = eng
        .answer(
            "What is the punishment for robbery under section 147?",
            Some(as_on(2026, 1, 1)),
            AnswerMode::Qa,
        )
        .await
        .unwrap();
    let json = serde_json::to_string(&contract).unwrap();
    let back: legal_rag_core::AnswerContract = serde_json::from_str(&json).unwrap();
    assert_eq!(back.statutes.len(), contract.statutes.len());
    assert_eq!(back.cases.len(), contract.cases.len());
    assert_eq!(back.confidence.score, contract.confidence.score);
    assert_eq!(back.short_answer, contract.short_answer);
}

#[tokio::test]
async fn round_trip_markdown_preserves_citation_and_quote_set() {
    let store = fixture_store();
    let eng = engine(store);
    let contract = eng
        .answer(
            "What is the punishment for robbery under section 147?",
            Some(as_on(2026, 1, 1)),
            AnswerMode::Qa,
        )
        .await
        .unwrap();
    let markdown = legal_rag_retrieval::assembler::render_markdown(&contract);

    for statute in &contract.statutes {
        assert!(markdown.contains(&statute.id));
        if let Some(quote) = &statute.quote {
            assert!(markdown.contains(quote.as_str()));
        }
    }
    for case in &contract.cases {
        assert!(markdown.contains(&case.id));
        if let Some(quote) = &case.quote {
            assert!(markdown.contains(quote.as_str()));
        }
    }
}

// --- Boundary behaviors ----------------------------------------------

#[tokio::test]
async fn boundary_empty_dense_nonempty_lexical_still_returns_hits() {
    let store = fixture_store();
    let eng = HybridRetrievalEngine::new(
        store,
        Arc::new(EmptyEmbedder),
        None,
        None,
        RetrievalConfig::default(),
        LegacyMappingTable::default(),
    );
    let outcome = eng
        .search("What is the punishment for robbery under section 147?", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(outcome.results.iter().any(|r| r.is_statute()));
}

#[tokio::test]
async fn boundary_empty_lexical_nonempty_dense_still_returns_hits() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("tell me about 147 provision here", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(outcome.results.iter().any(|r| r.is_statute()));
}

#[tokio::test]
async fn boundary_both_empty_triggers_refusal_or_clarification() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng.search("hi", Some(as_on(2026, 1, 1))).await.unwrap();
    assert!(should_refuse(&outcome.analysis) || clarifying_question(&outcome.analysis).is_some());
}

// --- End-to-end scenarios ---------------------------------------------

#[tokio::test]
async fn scenario_robbery_bns_query_returns_section_147() {
    let store = fixture_store();
    let eng = engine(store);
    let contract = eng
        .answer(
            "What is the punishment for robbery under the new code?",
            Some(as_on(2026, 1, 1)),
            AnswerMode::Qa,
        )
        .await
        .unwrap();
    assert!(contract.statutes.iter().any(|s| s.section.as_deref() == Some("147")));
}

#[tokio::test]
async fn scenario_named_party_resolves_maharashtra_v_xyz() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("As held in Maharashtra v. XYZ, the bail conditions were set.", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(outcome.results.iter().any(|r| r.id() == "SC:2020:0112:p1"));
}

#[tokio::test]
async fn scenario_quash_fir_section_482_bridges_to_matching_case() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("Can the FIR be quashed under section 482?", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(outcome.results.iter().any(|r| r.id() == "SC:2019:0998:p1"));
}

#[tokio::test]
async fn scenario_as_on_date_gates_out_section_147_before_effective_date() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("What does section 147 say as on 01/01/2024?", None)
        .await
        .unwrap();
    assert!(outcome
        .results
        .iter()
        .filter(|r| r.is_statute())
        .all(|r| r.metadata().section_no.as_deref() != Some("147")));
}

#[tokio::test]
async fn scenario_comparative_bail_query_asks_for_clarification() {
    let store = fixture_store();
    let eng = engine(store);
    let outcome = eng
        .search("Compare bail under CrPC and BNSS.", Some(as_on(2026, 1, 1)))
        .await
        .unwrap();
    assert!(clarifying_question(&outcome.analysis).is_some());
}

#[test]
fn scenario_bare_greeting_is_refused() {
    let analysis = analyze_query("hi");
    assert!(should_refuse(&analysis));
}

// --- Store-level filter sanity, used by several scenarios above ------

#[tokio::test]
async fn store_filters_compose_act_and_as_on_date() {
    let store = fixture_store();
    let filter = StatuteFilter {
        act: Some("BNS".into()),
        as_on_date: Some(as_on(2024, 8, 1)),
    };
    let rows = store.ann_statutes(&[1.0, 0.0, 0.0], 5, &filter).await.unwrap();
    assert!(rows.iter().any(|r| r.chunk.section_no == "147"));
}

#[tokio::test]
async fn store_case_filter_restricts_to_supreme_court_prefix() {
    let store = fixture_store();
    let filter = CaseFilter {
        doc_id_prefix: Some("SC:".into()),
        decision_date_to: Some(as_on(2026, 1, 1)),
    };
    let rows = store.ann_cases(&[1.0, 0.0, 0.0], 5, &filter).await.unwrap();
    assert!(rows.iter().all(|r| r.chunk.doc_id.starts_with("SC:")));
}
