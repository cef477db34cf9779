//! Shared data model: chunk records, query analysis, search results, and the
//! answer contract.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Token count for a chunk, constructor-validated against the `80..=800`
/// invariant. Ingestion owns enforcement; the retrieval
/// core trusts values that already passed through this type once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenCount(u32);

impl TokenCount {
    pub const MIN: u32 = 80;
    pub const MAX: u32 = 800;

    pub fn new(tokens: u32) -> Result<Self, String> {
        if tokens < Self::MIN || tokens > Self::MAX {
            return Err(format!(
                "token count {tokens} outside [{}, {}]",
                Self::MIN,
                Self::MAX
            ));
        }
        Ok(TokenCount(tokens))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// The legal unit a statute chunk represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum UnitType {
    Section,
    SubSection,
    Illustration,
    Explanation,
    Proviso,
}

impl UnitType {
    /// Accepts the original corpus's `"Sub"` abbreviation as a wire synonym
    /// for `SubSection`.
    pub fn parse_wire(value: &str) -> Option<Self> {
        match value {
            "Section" => Some(UnitType::Section),
            "Sub-section" | "SubSection" | "Sub" => Some(UnitType::SubSection),
            "Illustration" => Some(UnitType::Illustration),
            "Explanation" => Some(UnitType::Explanation),
            "Proviso" => Some(UnitType::Proviso),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatuteChunk {
    pub id: String,
    pub doc_id: String,
    pub act: String,
    pub year: i32,
    pub section_no: String,
    pub unit_type: UnitType,
    pub title: Option<String>,
    pub text: String,
    pub tokens: TokenCount,
    pub sha256: String,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    pub embedding: Vec<f32>,
}

impl StatuteChunk {
    pub fn canonical_id(&self) -> String {
        format!("{}:Sec:{}", self.doc_id, self.section_no)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentChunk {
    pub id: String,
    pub doc_id: String,
    pub case_title: String,
    pub decision_date: Option<NaiveDate>,
    pub bench: Vec<String>,
    pub citation_strings: Vec<String>,
    pub para_range: Option<String>,
    pub text: String,
    pub tokens: TokenCount,
    pub overlap_tokens: u16,
    pub sha256: String,
    pub embedding: Vec<f32>,
    pub order: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossRefType {
    StatuteStatute,
    JudgmentStatute,
    JudgmentJudgment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReference {
    pub src_id: String,
    pub dst_id: String,
    pub rel_type: CrossRefType,
    pub weight: f32,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Equivalent,
    Partial,
    Related,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMapping {
    pub bns_section: String,
    pub legacy_act: String,
    pub legacy_section: String,
    pub mapping_type: MappingType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Explicit,
    ActsInference,
    InferredYear,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalContext {
    pub as_on_date: NaiveDate,
    pub date_source: DateSource,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Factual,
    Procedural,
    Comparative,
    Ambiguous,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub temporal_context: Option<TemporalContext>,
    pub expanded_terms: HashMap<String, Vec<String>>,
    pub section_guesses: Vec<String>,
    pub explicit_sections: Vec<String>,
    pub case_mentions: Vec<(String, String)>,
    pub explicit_case_ids: Vec<String>,
    pub legal_terms: Vec<String>,
    pub offense_keywords: Vec<String>,
    pub query_type: Option<QueryType>,
}

/// Known, typed metadata carried alongside a `SearchResult`. Open-ended
/// fields are confined to `extensions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub doc_id: String,
    pub section_no: Option<String>,
    pub unit_type: Option<UnitType>,
    pub canonical_id: Option<String>,
    pub case_title: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub bench: Vec<String>,
    pub citation_strings: Vec<String>,
    pub para_range: Option<String>,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    pub final_score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub recency_score: f32,
    pub ce_score: Option<f32>,
    pub fallback_match: bool,
    pub party_resolver: bool,
    pub party_resolver_or: bool,
    pub citation_resolver: bool,
    pub fallback_doc_match: bool,
    pub legacy_mappings: Vec<LegacyMapping>,
    #[serde(default)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// A ranked retrieval candidate. Tagged-variant shape
/// in place of a dynamic `source_type` string plus optional fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum SearchResult {
    Statute {
        id: String,
        similarity_score: f32,
        content: String,
        metadata: ResultMetadata,
        authority_weight: f32,
    },
    Case {
        id: String,
        similarity_score: f32,
        content: String,
        metadata: ResultMetadata,
        authority_weight: f32,
    },
}

impl SearchResult {
    pub fn id(&self) -> &str {
        match self {
            SearchResult::Statute { id, .. } | SearchResult::Case { id, .. } => id,
        }
    }

    pub fn similarity_score(&self) -> f32 {
        match self {
            SearchResult::Statute {
                similarity_score, ..
            }
            | SearchResult::Case {
                similarity_score, ..
            } => *similarity_score,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            SearchResult::Statute { content, .. } | SearchResult::Case { content, .. } => content,
        }
    }

    pub fn metadata(&self) -> &ResultMetadata {
        match self {
            SearchResult::Statute { metadata, .. } | SearchResult::Case { metadata, .. } => {
                metadata
            }
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ResultMetadata {
        match self {
            SearchResult::Statute { metadata, .. } | SearchResult::Case { metadata, .. } => {
                metadata
            }
        }
    }

    pub fn final_score(&self) -> f32 {
        self.metadata().final_score
    }

    pub fn set_content(&mut self, content: String) {
        match self {
            SearchResult::Statute { content: c, .. } | SearchResult::Case { content: c, .. } => {
                *c = content
            }
        }
    }

    pub fn is_statute(&self) -> bool {
        matches!(self, SearchResult::Statute { .. })
    }

    pub fn is_case(&self) -> bool {
        matches!(self, SearchResult::Case { .. })
    }

    pub fn doc_id(&self) -> &str {
        &self.metadata().doc_id
    }
}

// --- Answer contract ---------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitedStatute {
    pub id: String,
    pub section: Option<String>,
    pub quote: Option<String>,
    pub as_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitedCase {
    pub id: String,
    pub citation: Option<String>,
    pub para: Option<String>,
    pub quote: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEntry {
    pub issue: String,
    pub application: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftFields {
    pub parties: String,
    pub court: String,
    pub facts: String,
    pub grounds: Vec<String>,
    pub reliefs: Vec<String>,
    pub prayer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftType {
    AnticipatoryBail,
    Quash,
    WrittenSubmissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    #[serde(rename = "type")]
    pub draft_type: DraftType,
    pub fields: DraftFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confidence {
    pub score: f32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerContract {
    pub short_answer: String,
    pub statutes: Vec<CitedStatute>,
    pub cases: Vec<CitedCase>,
    pub analysis: Vec<AnalysisEntry>,
    pub draft: Option<Draft>,
    pub confidence: Confidence,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_count_rejects_out_of_range() {
        assert!(TokenCount::new(10).is_err());
        assert!(TokenCount::new(900).is_err());
        assert!(TokenCount::new(80).is_ok());
        assert!(TokenCount::new(800).is_ok());
    }

    #[test]
    fn unit_type_accepts_wire_synonym() {
        assert_eq!(UnitType::parse_wire("Sub"), Some(UnitType::SubSection));
        assert_eq!(
            UnitType::parse_wire("Sub-section"),
            Some(UnitType::SubSection)
        );
        assert_eq!(UnitType::parse_wire("bogus"), None);
    }

    #[test]
    fn search_result_accessors_cover_both_variants() {
        let meta = ResultMetadata {
            doc_id: "BNS:2023".into(),
            final_score: 0.5,
            ..Default::default()
        };
        let statute = SearchResult::Statute {
            id: "s1".into(),
            similarity_score: 0.9,
            content: "text".into(),
            metadata: meta.clone(),
            authority_weight: 1.0,
        };
        assert_eq!(statute.id(), "s1");
        assert!(statute.is_statute());
        assert_eq!(statute.final_score(), 0.5);

        let case = SearchResult::Case {
            id: "c1".into(),
            similarity_score: 0.2,
            content: "text".into(),
            metadata: meta,
            authority_weight: 1.0,
        };
        assert!(case.is_case());
    }

    #[test]
    fn answer_contract_round_trips_through_json() {
        let answer = AnswerContract {
            short_answer: "Robbery is punishable under BNS:2023:Sec:147.".into(),
            statutes: vec![CitedStatute {
                id: "BNS:2023:chunk:0147".into(),
                section: Some("147".into()),
                quote: Some("Whoever commits robbery...".into()),
                as_on: Some("2026-07-30".into()),
            }],
            cases: vec![],
            analysis: vec![],
            draft: None,
            confidence: Confidence {
                score: 0.8,
                reasons: vec!["citations valid".into()],
            },
            warnings: vec![],
        };
        let json = serde_json::to_string(&answer).unwrap();
        let back: AnswerContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back.statutes.len(), 1);
        assert_eq!(back.confidence.score, 0.8);
    }
}
