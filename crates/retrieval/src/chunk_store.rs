//! Read interface over the chunk store.
//!
//! The retrieval core never writes to this store; a Postgres/Qdrant-backed
//! implementation is expected in production. `InMemoryChunkStore` is a
//! deterministic reference implementation used by the test suite: brute-
//! force cosine similarity stands in for ANN, and a token-overlap ranker
//! stands in for `ts_rank`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use legal_rag_core::{JudgmentChunk, StatuteChunk};

use crate::error::RetrievalError;

#[derive(Debug, Clone, Default)]
pub struct StatuteFilter {
    pub act: Option<String>,
    pub as_on_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub doc_id_prefix: Option<String>,
    pub decision_date_to: Option<NaiveDate>,
}

/// A scored row returned by the store, before it is lifted into a
/// `SearchResult` by the dense/lexical search adapters.
#[derive(Debug, Clone)]
pub struct ScoredStatute {
    pub chunk: StatuteChunk,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct ScoredCase {
    pub chunk: JudgmentChunk,
    pub score: f32,
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn ann_statutes(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: &StatuteFilter,
    ) -> Result<Vec<ScoredStatute>, RetrievalError>;

    async fn ann_cases(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: &CaseFilter,
    ) -> Result<Vec<ScoredCase>, RetrievalError>;

    async fn lexical_statutes(
        &self,
        query_tokens: &[String],
        k: usize,
        filter: &StatuteFilter,
    ) -> Result<Vec<ScoredStatute>, RetrievalError>;

    async fn lexical_cases(
        &self,
        query_tokens: &[String],
        k: usize,
        filter: &CaseFilter,
    ) -> Result<Vec<ScoredCase>, RetrievalError>;

    async fn statutes_by_section(
        &self,
        section_numbers: &[String],
    ) -> Result<Vec<StatuteChunk>, RetrievalError>;

    async fn cases_by_ids(&self, ids: &[String]) -> Result<Vec<JudgmentChunk>, RetrievalError>;

    async fn cases_by_doc_id(&self, doc_id: &str) -> Result<Vec<JudgmentChunk>, RetrievalError>;

    async fn cases_by_title_substring(
        &self,
        needle_lower: &str,
        limit: usize,
    ) -> Result<Vec<JudgmentChunk>, RetrievalError>;

    async fn cases_by_citation_substring(
        &self,
        needle_lower: &str,
        limit: usize,
    ) -> Result<Vec<JudgmentChunk>, RetrievalError>;

    async fn hydrate_statutes(&self, ids: &[String]) -> Result<HashMap<String, String>, RetrievalError>;

    async fn hydrate_cases(&self, ids: &[String]) -> Result<HashMap<String, String>, RetrievalError>;
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn tokenize_lower(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryChunkStore {
    pub statutes: Vec<StatuteChunk>,
    pub cases: Vec<JudgmentChunk>,
}

impl InMemoryChunkStore {
    pub fn new(statutes: Vec<StatuteChunk>, cases: Vec<JudgmentChunk>) -> Self {
        Self { statutes, cases }
    }

    fn statute_passes_filter(chunk: &StatuteChunk, filter: &StatuteFilter) -> bool {
        if let Some(act) = &filter.act {
            if &chunk.act != act {
                return false;
            }
        }
        if let Some(as_on) = filter.as_on_date {
            if let Some(from) = chunk.effective_from {
                if from > as_on {
                    return false;
                }
            }
            if let Some(to) = chunk.effective_to {
                if to <= as_on {
                    return false;
                }
            }
        }
        true
    }

    fn case_passes_filter(chunk: &JudgmentChunk, filter: &CaseFilter) -> bool {
        if let Some(prefix) = &filter.doc_id_prefix {
            if !chunk.doc_id.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(to) = filter.decision_date_to {
            if let Some(decided) = chunk.decision_date {
                if decided > to {
                    return false;
                }
            }
        }
        true
    }

    fn lexical_overlap_score(tokens: &[String], text: &str) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        let haystack = tokenize_lower(text);
        let hits = tokens
            .iter()
            .filter(|t| haystack.iter().any(|h| h == t.as_str()))
            .count();
        hits as f32 / tokens.len() as f32
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn ann_statutes(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: &StatuteFilter,
    ) -> Result<Vec<ScoredStatute>, RetrievalError> {
        let mut scored: Vec<ScoredStatute> = self
            .statutes
            .iter()
            .filter(|c| Self::statute_passes_filter(c, filter))
            .map(|c| ScoredStatute {
                chunk: c.clone(),
                score: cosine_similarity(query_embedding, &c.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    async fn ann_cases(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: &CaseFilter,
    ) -> Result<Vec<ScoredCase>, RetrievalError> {
        let mut scored: Vec<ScoredCase> = self
            .cases
            .iter()
            .filter(|c| Self::case_passes_filter(c, filter))
            .map(|c| ScoredCase {
                chunk: c.clone(),
                score: cosine_similarity(query_embedding, &c.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    async fn lexical_statutes(
        &self,
        query_tokens: &[String],
        k: usize,
        filter: &StatuteFilter,
    ) -> Result<Vec<ScoredStatute>, RetrievalError> {
        let mut scored: Vec<ScoredStatute> = self
            .statutes
            .iter()
            .filter(|c| Self::statute_passes_filter(c, filter))
            .map(|c| ScoredStatute {
                chunk: c.clone(),
                score: Self::lexical_overlap_score(query_tokens, &c.text),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    async fn lexical_cases(
        &self,
        query_tokens: &[String],
        k: usize,
        filter: &CaseFilter,
    ) -> Result<Vec<ScoredCase>, RetrievalError> {
        let mut scored: Vec<ScoredCase> = self
            .cases
            .iter()
            .filter(|c| Self::case_passes_filter(c, filter))
            .map(|c| ScoredCase {
                chunk: c.clone(),
                score: Self::lexical_overlap_score(query_tokens, &c.text),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        scored.truncate(k);
        Ok(scored)
    }

    async fn statutes_by_section(
        &self,
        section_numbers: &[String],
    ) -> Result<Vec<StatuteChunk>, RetrievalError> {
        Ok(self
            .statutes
            .iter()
            .filter(|c| section_numbers.iter().any(|s| s == &c.section_no))
            .cloned()
            .collect())
    }

    async fn cases_by_ids(&self, ids: &[String]) -> Result<Vec<JudgmentChunk>, RetrievalError> {
        Ok(self
            .cases
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn cases_by_doc_id(&self, doc_id: &str) -> Result<Vec<JudgmentChunk>, RetrievalError> {
        let mut rows: Vec<JudgmentChunk> = self
            .cases
            .iter()
            .filter(|c| c.doc_id == doc_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.order);
        Ok(rows)
    }

    async fn cases_by_title_substring(
        &self,
        needle_lower: &str,
        limit: usize,
    ) -> Result<Vec<JudgmentChunk>, RetrievalError> {
        let mut rows: Vec<JudgmentChunk> = self
            .cases
            .iter()
            .filter(|c| c.case_title.to_lowercase().contains(needle_lower))
            .cloned()
            .collect();
        rows.truncate(limit);
        Ok(rows)
    }

    async fn cases_by_citation_substring(
        &self,
        needle_lower: &str,
        limit: usize,
    ) -> Result<Vec<JudgmentChunk>, RetrievalError> {
        let mut rows: Vec<JudgmentChunk> = self
            .cases
            .iter()
            .filter(|c| {
                c.citation_strings
                    .iter()
                    .any(|s| s.to_lowercase().contains(needle_lower))
            })
            .cloned()
            .collect();
        rows.truncate(limit);
        Ok(rows)
    }

    async fn hydrate_statutes(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, String>, RetrievalError> {
        Ok(self
            .statutes
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| (c.id.clone(), c.text.clone()))
            .collect())
    }

    async fn hydrate_cases(&self, ids: &[String]) -> Result<HashMap<String, String>, RetrievalError> {
        Ok(self
            .cases
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| (c.id.clone(), c.text.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::{TokenCount, UnitType};

    fn statute(id: &str, section_no: &str, embedding: Vec<f32>) -> StatuteChunk {
        StatuteChunk {
            id: id.into(),
            doc_id: "BNS:2023".into(),
            act: "BNS".into(),
            year: 2023,
            section_no: section_no.into(),
            unit_type: UnitType::Section,
            title: None,
            text: format!("section {section_no} text body about robbery"),
            tokens: TokenCount::new(100).unwrap(),
            sha256: "deadbeef".into(),
            effective_from: Some(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()),
            effective_to: None,
            embedding,
        }
    }

    #[tokio::test]
    async fn ann_statutes_filters_by_effective_date() {
        let store = InMemoryChunkStore::new(vec![statute("s1", "147", vec![1.0, 0.0])], vec![]);
        let filter = StatuteFilter {
            act: None,
            as_on_date: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
        };
        let rows = store.ann_statutes(&[1.0, 0.0], 5, &filter).await.unwrap();
        assert!(rows.is_empty());

        let filter = StatuteFilter {
            act: None,
            as_on_date: Some(NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()),
        };
        let rows = store.ann_statutes(&[1.0, 0.0], 5, &filter).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn lexical_statutes_ranks_by_token_overlap() {
        let store = InMemoryChunkStore::new(
            vec![statute("s1", "147", vec![]), statute("s2", "303", vec![])],
            vec![],
        );
        let tokens = vec!["robbery".to_string(), "147".to_string()];
        let rows = store
            .lexical_statutes(&tokens, 5, &StatuteFilter::default())
            .await
            .unwrap();
        assert_eq!(rows[0].chunk.id, "s1");
    }
}
