//! Answer Assembler.
//!
//! Builds a token-budgeted context block from the ranked retrieval set
//! and renders the strict `AnswerContract`. `short_answer` and
//! `analysis[].application` are produced from deterministic templates
//! over the verified, ranked retrieval set — this engine does not call
//! an LLM (Non-goal: "generative drafting beyond the structured answer
//! contract"); a caller that wants richer generation wraps this engine.

use legal_rag_config::RetrievalConfig;
use legal_rag_core::{
    AnalysisEntry, AnswerContract, CitedCase, CitedStatute, Confidence, Draft, DraftFields,
    DraftType, QueryAnalysis, SearchResult, TemporalContext,
};

/// Rough chars-per-token used to translate the configured token budget
/// into a character budget for the deterministic context block; no
/// tokenizer dependency is needed for this internal sizing heuristic.
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMode {
    Qa,
    Drafting,
    Summarization,
}

impl Default for AnswerMode {
    fn default() -> Self {
        AnswerMode::Qa
    }
}

pub struct AssemblerInput<'a> {
    pub query: &'a str,
    pub analysis: &'a QueryAnalysis,
    pub temporal: &'a TemporalContext,
    pub results: &'a [SearchResult],
    pub mode: AnswerMode,
}

fn truncate_quote(text: &str, max_chars: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    collapsed.chars().take(max_chars).collect()
}

/// Greedily includes ranked results in their existing order until the
/// character budget (derived from `context_token_budget *
/// (1 - response_reserve_fraction)`) is exhausted. Returns the prefix
/// of `results` that fits.
fn budget_results<'a>(results: &'a [SearchResult], config: &RetrievalConfig) -> Vec<&'a SearchResult> {
    let reserved_fraction = config.response_reserve_fraction.clamp(0.0, 1.0);
    let usable_tokens = (config.context_token_budget as f32 * (1.0 - reserved_fraction)).max(0.0);
    let char_budget = usable_tokens as usize * CHARS_PER_TOKEN;

    let mut spent = 0usize;
    let mut kept = Vec::with_capacity(results.len());
    for result in results {
        let cost = result.content().len();
        if spent + cost > char_budget && !kept.is_empty() {
            break;
        }
        spent += cost;
        kept.push(result);
    }
    kept
}

fn cited_statute(result: &SearchResult, as_on: &str, quote_max_chars: usize) -> CitedStatute {
    let meta = result.metadata();
    CitedStatute {
        id: result.id().to_string(),
        section: meta.section_no.clone(),
        quote: Some(truncate_quote(result.content(), quote_max_chars)),
        as_on: Some(as_on.to_string()),
    }
}

fn cited_case(result: &SearchResult, quote_max_chars: usize) -> CitedCase {
    let meta = result.metadata();
    CitedCase {
        id: result.id().to_string(),
        citation: meta.citation_strings.first().cloned(),
        para: meta.para_range.clone(),
        quote: Some(truncate_quote(result.content(), quote_max_chars)),
    }
}

fn short_answer(
    query: &str,
    statutes: &[CitedStatute],
    cases: &[CitedCase],
) -> String {
    match statutes.first() {
        Some(statute) => {
            let quote = statute.quote.clone().unwrap_or_default();
            format!("Under {}, {}", statute.id, quote)
        }
        None => match cases.first() {
            Some(case) => format!(
                "The retrieved judgment {} is most relevant to \"{}\".",
                case.id, query
            ),
            None => format!(
                "No statute or case material directly on point was retrieved for \"{}\".",
                query
            ),
        },
    }
}

fn build_analysis(statutes: &[CitedStatute], cases: &[CitedCase]) -> Vec<AnalysisEntry> {
    let mut entries = Vec::new();
    for statute in statutes.iter().take(3) {
        entries.push(AnalysisEntry {
            issue: format!("Applicability of {}", statute.id),
            application: format!(
                "{} governs the issue{}.",
                statute.id,
                statute
                    .section
                    .as_ref()
                    .map(|s| format!(" (section {s})"))
                    .unwrap_or_default()
            ),
        });
    }
    for case in cases.iter().take(2) {
        entries.push(AnalysisEntry {
            issue: format!("Judicial treatment in {}", case.id),
            application: format!(
                "{} is cited in support{}.",
                case.id,
                case.citation
                    .as_ref()
                    .map(|c| format!(" ({c})"))
                    .unwrap_or_default()
            ),
        });
    }
    entries
}

/// Drafting mode produces a minimal `Draft` scaffold from whatever the
/// query analysis already extracted (case-mention parties, offense
/// keywords); it never invents facts not present in the query or the
/// retrieved set.
fn build_draft(analysis: &QueryAnalysis, statutes: &[CitedStatute]) -> Draft {
    let parties = analysis
        .case_mentions
        .first()
        .map(|(a, b)| format!("{a} v. {b}"))
        .unwrap_or_else(|| "Petitioner v. State".to_string());

    let grounds: Vec<String> = statutes
        .iter()
        .map(|s| format!("Relief under {}", s.id))
        .collect();

    Draft {
        draft_type: DraftType::WrittenSubmissions,
        fields: DraftFields {
            parties,
            court: "Court of competent jurisdiction".to_string(),
            facts: analysis.original_query.clone(),
            grounds,
            reliefs: vec!["Such other relief as the Court deems fit.".to_string()],
            prayer: "It is most respectfully prayed that this Hon'ble Court may be pleased to grant relief as prayed.".to_string(),
        },
    }
}

/// Assembles the `AnswerContract` from a ranked, capped retrieval
/// outcome. `confidence` is left as a zero placeholder; the verifier
/// computes the real value after citation/quote checks.
pub fn assemble_answer(input: AssemblerInput<'_>, config: &RetrievalConfig) -> AnswerContract {
    let kept = budget_results(input.results, config);

    let as_on = input.temporal.as_on_date.to_string();
    let statutes: Vec<CitedStatute> = kept
        .iter()
        .filter(|r| r.is_statute())
        .map(|r| cited_statute(r, &as_on, config.quote_max_chars))
        .collect();
    let cases: Vec<CitedCase> = kept
        .iter()
        .filter(|r| r.is_case())
        .map(|r| cited_case(r, config.quote_max_chars))
        .collect();

    let analysis = build_analysis(&statutes, &cases);
    let short_answer = short_answer(input.query, &statutes, &cases);
    let draft = if input.mode == AnswerMode::Drafting {
        Some(build_draft(input.analysis, &statutes))
    } else {
        None
    };

    AnswerContract {
        short_answer,
        statutes,
        cases,
        analysis,
        draft,
        confidence: Confidence {
            score: 0.0,
            reasons: Vec::new(),
        },
        warnings: Vec::new(),
    }
}

/// Renders the JSON contract as Markdown, preserving every citation and
/// quote. Section order: Short
/// Answer, Statutes, Cases, Application to Facts, Draft, Confidence,
/// Warnings.
pub fn render_markdown(answer: &AnswerContract) -> String {
    let mut out = String::new();
    out.push_str("## Short Answer\n\n");
    out.push_str(&answer.short_answer);
    out.push_str("\n\n");

    if !answer.statutes.is_empty() {
        out.push_str("## Statutes\n\n");
        for statute in &answer.statutes {
            out.push_str(&format!("- **{}**", statute.id));
            if let Some(section) = &statute.section {
                out.push_str(&format!(" (Section {section})"));
            }
            if let Some(as_on) = &statute.as_on {
                out.push_str(&format!(" — as on {as_on}"));
            }
            out.push('\n');
            if let Some(quote) = &statute.quote {
                out.push_str(&format!("  > {quote}\n"));
            }
        }
        out.push('\n');
    }

    if !answer.cases.is_empty() {
        out.push_str("## Cases\n\n");
        for case in &answer.cases {
            out.push_str(&format!("- **{}**", case.id));
            if let Some(citation) = &case.citation {
                out.push_str(&format!(" ({citation})"));
            }
            if let Some(para) = &case.para {
                out.push_str(&format!(" {para}"));
            }
            out.push('\n');
            if let Some(quote) = &case.quote {
                out.push_str(&format!("  > {quote}\n"));
            }
        }
        out.push('\n');
    }

    if !answer.analysis.is_empty() {
        out.push_str("## Application to Facts\n\n");
        for entry in &answer.analysis {
            out.push_str(&format!("- **{}**: {}\n", entry.issue, entry.application));
        }
        out.push('\n');
    }

    if let Some(draft) = &answer.draft {
        out.push_str("## Draft\n\n");
        out.push_str(&format!("Parties: {}\n\n", draft.fields.parties));
        out.push_str(&format!("Court: {}\n\n", draft.fields.court));
        out.push_str(&format!("Facts: {}\n\n", draft.fields.facts));
        if !draft.fields.grounds.is_empty() {
            out.push_str("Grounds:\n");
            for ground in &draft.fields.grounds {
                out.push_str(&format!("- {ground}\n"));
            }
        }
        if !draft.fields.reliefs.is_empty() {
            out.push_str("Reliefs:\n");
            for relief in &draft.fields.reliefs {
                out.push_str(&format!("- {relief}\n"));
            }
        }
        out.push_str(&format!("\nPrayer: {}\n\n", draft.fields.prayer));
    }

    out.push_str("## Confidence\n\n");
    out.push_str(&format!("Score: {:.2}\n", answer.confidence.score));
    for reason in &answer.confidence.reasons {
        out.push_str(&format!("- {reason}\n"));
    }
    out.push('\n');

    if !answer.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in &answer.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use legal_rag_core::{DateSource, QueryType, ResultMetadata};
    use std::collections::HashMap;

    fn statute_result(id: &str, section: &str, text: &str, score: f32) -> SearchResult {
        SearchResult::Statute {
            id: id.into(),
            similarity_score: score,
            content: text.into(),
            metadata: ResultMetadata {
                section_no: Some(section.into()),
                final_score: score,
                ..Default::default()
            },
            authority_weight: 1.0,
        }
    }

    fn analysis() -> QueryAnalysis {
        QueryAnalysis {
            original_query: "punishment for robbery".into(),
            temporal_context: None,
            expanded_terms: HashMap::new(),
            section_guesses: vec!["BNS:2023:Sec:147".into()],
            explicit_sections: vec![],
            case_mentions: vec![],
            explicit_case_ids: vec![],
            legal_terms: vec!["robbery".into()],
            offense_keywords: vec!["robbery".into()],
            query_type: Some(QueryType::Factual),
        }
    }

    fn temporal() -> TemporalContext {
        TemporalContext {
            as_on_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            date_source: DateSource::Default,
            confidence: 0.2,
        }
    }

    #[test]
    fn short_answer_cites_dominant_statute() {
        let results = vec![statute_result(
            "BNS:2023:chunk:0147",
            "147",
            "Whoever commits robbery shall be punished with rigorous imprisonment.",
            0.9,
        )];
        let analysis = analysis();
        let temporal = temporal();
        let input = AssemblerInput {
            query: "punishment for robbery",
            analysis: &analysis,
            temporal: &temporal,
            results: &results,
            mode: AnswerMode::Qa,
        };
        let config = RetrievalConfig::default();
        let contract = assemble_answer(input, &config);
        assert!(contract.short_answer.contains("BNS:2023:chunk:0147"));
        assert_eq!(contract.statutes.len(), 1);
        assert!(contract.statutes[0].quote.is_some());
    }

    #[test]
    fn quotes_respect_max_chars() {
        let long_text = "a".repeat(1000);
        let results = vec![statute_result("s1", "147", &long_text, 0.9)];
        let analysis = analysis();
        let temporal = temporal();
        let config = RetrievalConfig::default();
        let input = AssemblerInput {
            query: "q",
            analysis: &analysis,
            temporal: &temporal,
            results: &results,
            mode: AnswerMode::Qa,
        };
        let contract = assemble_answer(input, &config);
        let quote = contract.statutes[0].quote.as_ref().unwrap();
        assert!(quote.chars().count() <= config.quote_max_chars);
    }

    #[test]
    fn markdown_preserves_all_citations_and_quotes() {
        let results = vec![statute_result("s1", "147", "Robbery text body.", 0.9)];
        let analysis = analysis();
        let temporal = temporal();
        let config = RetrievalConfig::default();
        let input = AssemblerInput {
            query: "q",
            analysis: &analysis,
            temporal: &temporal,
            results: &results,
            mode: AnswerMode::Qa,
        };
        let contract = assemble_answer(input, &config);
        let markdown = render_markdown(&contract);
        assert!(markdown.contains("s1"));
        assert!(markdown.contains("Robbery text body."));
    }

    #[test]
    fn drafting_mode_populates_draft() {
        let results = vec![statute_result("s1", "147", "Robbery text body.", 0.9)];
        let analysis = analysis();
        let temporal = temporal();
        let config = RetrievalConfig::default();
        let input = AssemblerInput {
            query: "q",
            analysis: &analysis,
            temporal: &temporal,
            results: &results,
            mode: AnswerMode::Drafting,
        };
        let contract = assemble_answer(input, &config);
        assert!(contract.draft.is_some());
    }
}
