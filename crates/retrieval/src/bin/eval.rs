//! Evaluation harness: `cargo run --bin eval -- golden.jsonl`.
//!
//! Reads a golden set of `{question, expected_statutes, expected_cases}`
//! rows, drives `HybridRetrievalEngine` in-process (no HTTP hop, so it
//! can run against any `ChunkStore` without a server listening), and
//! reports Statute@3, Statute@5, Case@5, Case@8, overall recall,
//! retrieval latency percentiles, and the cross-encoder cache hit-rate.
//!
//! The corpus is loaded from the file named by `LEGAL_RAG_EVAL_CORPUS`
//! (a JSON object `{"statutes": [...], "cases": [...]}`); without it the
//! harness runs against an empty store, which is only useful for timing
//! the refusal/clarification fast paths.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;

use legal_rag_config::{LegacyMappingTable, RetrievalConfig};
use legal_rag_core::{JudgmentChunk, StatuteChunk};
use legal_rag_retrieval::{
    ChunkStore, CrossEncoderReranker, EmbeddingClient, EmbeddingError, HybridRetrievalEngine,
    InMemoryChunkStore, RemoteEmbeddingClient, EMBEDDING_DIM,
};

#[derive(Debug, Deserialize)]
struct GoldenRow {
    question: String,
    #[serde(default)]
    expected_statutes: Vec<String>,
    #[serde(default)]
    expected_cases: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CorpusFile {
    #[serde(default)]
    statutes: Vec<StatuteChunk>,
    #[serde(default)]
    cases: Vec<JudgmentChunk>,
}

/// Stand-in for a real embedding endpoint: every vector comes back
/// zeroed, matching the server's `NullEmbeddingClient` fallback, so the
/// harness is runnable without network access. Set
/// `LEGAL_RAG_EMBEDDING_ENDPOINT` to exercise dense search for real.
struct ZeroEmbeddingClient;

#[async_trait]
impl EmbeddingClient for ZeroEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![0.0; EMBEDDING_DIM]).collect())
    }
}

fn build_embedder() -> Arc<dyn EmbeddingClient> {
    match std::env::var("LEGAL_RAG_EMBEDDING_ENDPOINT") {
        Ok(endpoint) => {
            let api_key = std::env::var("LEGAL_RAG_EMBEDDING_API_KEY").unwrap_or_default();
            let model = std::env::var("LEGAL_RAG_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".to_string());
            Arc::new(RemoteEmbeddingClient::new(endpoint, api_key, model))
        }
        Err(_) => Arc::new(ZeroEmbeddingClient),
    }
}

fn load_corpus() -> anyhow::Result<CorpusFile> {
    match std::env::var("LEGAL_RAG_EVAL_CORPUS") {
        Ok(path) => {
            let raw = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        Err(_) => {
            tracing::warn!("LEGAL_RAG_EVAL_CORPUS not set, evaluating against an empty store");
            Ok(CorpusFile::default())
        }
    }
}

fn percentile(sorted_ms: &[f64], p: f64) -> f64 {
    if sorted_ms.is_empty() {
        return 0.0;
    }
    let idx = ((sorted_ms.len() - 1) as f64 * p).round() as usize;
    sorted_ms[idx]
}

/// Hit rate at `k`: the fraction of rows (with at least one expected id
/// of this kind) whose top-`k` results of that kind contain any expected id.
fn hit_rate_at_k(rows: &[(Vec<String>, Vec<String>)], k: usize) -> f64 {
    let (mut hit, mut total) = (0usize, 0usize);
    for (expected, retrieved) in rows {
        if expected.is_empty() {
            continue;
        }
        total += 1;
        let top_k: HashSet<&str> = retrieved.iter().take(k).map(String::as_str).collect();
        if expected.iter().any(|e| top_k.contains(e.as_str())) {
            hit += 1;
        }
    }
    if total == 0 {
        1.0
    } else {
        hit as f64 / total as f64
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let golden_path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: eval <golden.jsonl>"))?;
    let golden_raw = fs::read_to_string(&golden_path)?;
    let golden: Vec<GoldenRow> = golden_raw
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(anyhow::Error::from))
        .collect::<anyhow::Result<_>>()?;

    let corpus = load_corpus()?;
    let store: Arc<dyn ChunkStore> = Arc::new(InMemoryChunkStore::new(corpus.statutes, corpus.cases));
    let reranker: Option<Arc<CrossEncoderReranker>> = None;
    let engine = HybridRetrievalEngine::new(
        store,
        build_embedder(),
        reranker.clone(),
        None,
        RetrievalConfig::default(),
        LegacyMappingTable::default(),
    );

    let mut statute_rows: Vec<(Vec<String>, Vec<String>)> = Vec::new();
    let mut case_rows: Vec<(Vec<String>, Vec<String>)> = Vec::new();
    let mut latencies_ms: Vec<f64> = Vec::new();
    let mut recall_hit = 0usize;
    let mut recall_total = 0usize;

    for row in &golden {
        let started = Instant::now();
        let outcome = match engine.search(&row.question, None).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(question = %row.question, error = %err, "query failed, skipping");
                continue;
            }
        };
        latencies_ms.push(started.elapsed().as_secs_f64() * 1000.0);

        let retrieved_statutes: Vec<String> = outcome
            .results
            .iter()
            .filter(|r| r.is_statute())
            .map(|r| r.id().to_string())
            .collect();
        let retrieved_cases: Vec<String> = outcome
            .results
            .iter()
            .filter(|r| r.is_case())
            .map(|r| r.id().to_string())
            .collect();

        let expected_all: Vec<&String> = row
            .expected_statutes
            .iter()
            .chain(row.expected_cases.iter())
            .collect();
        if !expected_all.is_empty() {
            let retrieved_all: HashSet<&str> = retrieved_statutes
                .iter()
                .chain(retrieved_cases.iter())
                .map(String::as_str)
                .collect();
            recall_total += expected_all.len();
            recall_hit += expected_all
                .iter()
                .filter(|e| retrieved_all.contains(e.as_str()))
                .count();
        }

        statute_rows.push((row.expected_statutes.clone(), retrieved_statutes));
        case_rows.push((row.expected_cases.clone(), retrieved_cases));
    }

    latencies_ms.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let max_latency = latencies_ms.last().copied().unwrap_or(0.0);
    let recall = if recall_total == 0 {
        1.0
    } else {
        recall_hit as f64 / recall_total as f64
    };
    let (ce_hits, ce_misses) = reranker
        .as_ref()
        .map(|r| r.cache_stats())
        .unwrap_or((0, 0));
    let ce_hit_rate = if ce_hits + ce_misses == 0 {
        0.0
    } else {
        ce_hits as f64 / (ce_hits + ce_misses) as f64
    };

    println!("queries evaluated: {}", golden.len());
    println!("Statute@3: {:.3}", hit_rate_at_k(&statute_rows, 3));
    println!("Statute@5: {:.3}", hit_rate_at_k(&statute_rows, 5));
    println!("Case@5:    {:.3}", hit_rate_at_k(&case_rows, 5));
    println!("Case@8:    {:.3}", hit_rate_at_k(&case_rows, 8));
    println!("recall:    {:.3}", recall);
    println!(
        "latency ms (p50/p95/max): {:.1} / {:.1} / {:.1}",
        percentile(&latencies_ms, 0.50),
        percentile(&latencies_ms, 0.95),
        max_latency
    );
    println!(
        "CE cache hit-rate: {:.3} ({} hits / {} misses)",
        ce_hit_rate, ce_hits, ce_misses
    );

    Ok(())
}
