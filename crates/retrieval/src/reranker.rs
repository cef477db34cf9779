//! Cross-encoder reranking.
//!
//! Applies to case candidates only. Scores are blended with the
//! existing fused score (`0.65*current + 0.35*ce`) and cached by
//! `(sha256(query_short), candidate_id)` so a repeated query against
//! the same candidate set skips inference entirely. Once the
//! underlying model fails, the reranker flips to a permanent no-op
//! sentinel for the remaining lifetime of the process rather than
//! retrying a broken backend on every request.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use legal_rag_core::SearchResult;

pub const CE_CURRENT_WEIGHT: f32 = 0.65;
pub const CE_WEIGHT: f32 = 0.35;
/// Only the first N characters of the query are hashed into the cache
/// key; this keeps the key stable across trivial whitespace variation
/// without needing to canonicalize the whole query string.
const QUERY_HASH_PREFIX_CHARS: usize = 256;

#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Scores a (query, candidate_text) pair. Errors are treated by the
    /// caller as a permanent model failure.
    async fn score(&self, query: &str, candidate: &str) -> Result<f32, String>;
}

fn cache_key(query: &str, candidate_id: &str) -> String {
    let prefix: String = query.chars().take(QUERY_HASH_PREFIX_CHARS).collect();
    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    let digest = hasher.finalize();
    format!("{digest:x}:{candidate_id}")
}

pub struct CrossEncoderReranker {
    model: Arc<dyn CrossEncoder>,
    cache: Mutex<LruCache<String, f32>>,
    disabled: AtomicBool,
    cache_hits: std::sync::atomic::AtomicU64,
    cache_misses: std::sync::atomic::AtomicU64,
}

impl CrossEncoderReranker {
    pub fn new(model: Arc<dyn CrossEncoder>, cache_capacity: usize) -> Self {
        Self {
            model,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(cache_capacity.max(1)).unwrap())),
            disabled: AtomicBool::new(false),
            cache_hits: std::sync::atomic::AtomicU64::new(0),
            cache_misses: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// `(hits, misses)` against the CE score cache since construction, for
    /// the evaluation harness's cache hit-rate metric.
    pub fn cache_stats(&self) -> (u64, u64) {
        (
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
        )
    }

    async fn ce_score(&self, query: &str, candidate_id: &str, candidate_text: &str) -> Option<f32> {
        if self.disabled.load(Ordering::Relaxed) {
            return None;
        }

        let key = cache_key(query, candidate_id);
        if let Some(cached) = self.cache.lock().get(&key).copied() {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Some(cached);
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        match self.model.score(query, candidate_text).await {
            Ok(score) => {
                self.cache.lock().put(key, score);
                Some(score)
            }
            Err(err) => {
                tracing::warn!(error = %err, "cross-encoder failed, disabling reranker for process lifetime");
                self.disabled.store(true, Ordering::Relaxed);
                None
            }
        }
    }

    /// Reranks up to `max_candidates` case results in place; statute
    /// results and any candidates beyond the cap pass through untouched.
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<SearchResult>,
        max_candidates: usize,
    ) -> Vec<SearchResult> {
        if self.disabled.load(Ordering::Relaxed) {
            return candidates;
        }

        let mut rescored = 0usize;
        for candidate in candidates.iter_mut() {
            if !candidate.is_case() {
                continue;
            }
            if rescored >= max_candidates {
                break;
            }
            rescored += 1;

            let current_score = candidate.final_score();
            let id = candidate.id().to_string();
            let content = candidate.content().to_string();

            let Some(ce_score) = self.ce_score(query, &id, &content).await else {
                break;
            };

            let blended = CE_CURRENT_WEIGHT * current_score + CE_WEIGHT * ce_score;
            candidate.metadata_mut().ce_score = Some(ce_score);
            candidate.metadata_mut().final_score = blended;
        }

        candidates.sort_by(|a, b| b.final_score().partial_cmp(&a.final_score()).unwrap());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::ResultMetadata;
    use std::sync::atomic::AtomicUsize;

    fn case_result(id: &str, score: f32) -> SearchResult {
        SearchResult::Case {
            id: id.into(),
            similarity_score: score,
            content: format!("content for {id}"),
            metadata: ResultMetadata {
                final_score: score,
                ..Default::default()
            },
            authority_weight: 1.0,
        }
    }

    struct FixedScorer(f32);

    #[async_trait]
    impl CrossEncoder for FixedScorer {
        async fn score(&self, _query: &str, _candidate: &str) -> Result<f32, String> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl CrossEncoder for FailingScorer {
        async fn score(&self, _query: &str, _candidate: &str) -> Result<f32, String> {
            Err("model unavailable".into())
        }
    }

    struct CountingScorer(AtomicUsize);

    #[async_trait]
    impl CrossEncoder for CountingScorer {
        async fn score(&self, _query: &str, _candidate: &str) -> Result<f32, String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(0.5)
        }
    }

    #[tokio::test]
    async fn blends_current_and_ce_scores() {
        let reranker = CrossEncoderReranker::new(Arc::new(FixedScorer(1.0)), 100);
        let results = reranker
            .rerank("query", vec![case_result("a", 0.5)], 10)
            .await;
        let expected = CE_CURRENT_WEIGHT * 0.5 + CE_WEIGHT * 1.0;
        assert!((results[0].final_score() - expected).abs() < 1e-6);
    }

    #[tokio::test]
    async fn permanently_disables_after_model_failure() {
        let reranker = CrossEncoderReranker::new(Arc::new(FailingScorer), 100);
        let results = reranker
            .rerank("query", vec![case_result("a", 0.5)], 10)
            .await;
        assert_eq!(results[0].final_score(), 0.5);
        assert!(reranker.is_disabled());

        let results2 = reranker
            .rerank("query", vec![case_result("b", 0.9)], 10)
            .await;
        assert_eq!(results2[0].final_score(), 0.9);
    }

    #[tokio::test]
    async fn caches_repeated_query_candidate_pairs() {
        let counter = Arc::new(CountingScorer(AtomicUsize::new(0)));
        let reranker = CrossEncoderReranker::new(counter.clone(), 100);
        reranker
            .rerank("same query", vec![case_result("a", 0.5)], 10)
            .await;
        reranker
            .rerank("same query", vec![case_result("a", 0.5)], 10)
            .await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_stats_track_hits_and_misses() {
        let reranker = CrossEncoderReranker::new(Arc::new(FixedScorer(1.0)), 100);
        reranker.rerank("q", vec![case_result("a", 0.5)], 10).await;
        reranker.rerank("q", vec![case_result("a", 0.5)], 10).await;
        let (hits, misses) = reranker.cache_stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
    }
}
