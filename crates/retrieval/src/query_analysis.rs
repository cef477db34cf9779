//! Query Analyzer.
//!
//! Extracts temporal context, legal terms, explicit citations/section
//! numbers, case-title mentions, and a query-type classification from
//! the raw query string. The original corpus's extra "difference"/"how"
//! → procedural branch is deliberately dropped (see DESIGN.md).

use std::collections::HashMap;

use chrono::NaiveDate;
use legal_rag_core::{QueryAnalysis, QueryType};
use once_cell::sync::Lazy;
use regex::Regex;

use legal_rag_config::{LEGAL_SYNONYMS, OFFENSE_SECTION_GUESSES};

static SECTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsection\s+(\d+[a-z]?)\b").unwrap());
static CASE_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bSC:\d{4}:\d+\b").unwrap());
static CASE_MENTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([A-Z][\w.&' -]{1,60}?)\s+v\.?\s+([A-Z][\w.&' -]{1,60}?)\b").unwrap());
static CITATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:AIR|SCC|SCR)\s*\d{4}\b").unwrap());
static AS_ON_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bas\s+on\s+(\d{1,2})[\s./-](\d{1,2})[\s./-](\d{4})\b").unwrap()
});
static AS_ON_MONTH_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bas\s+on\s+(\d{1,2})\s+([a-z]+)\s+(\d{4})\b").unwrap()
});

const MONTH_NAMES: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const STOP_PHRASES: &[&str] = &["the case of", "in the matter of", "as held in", "as per"];

fn strip_stop_phrases(text: &str) -> String {
    let mut out = text.to_lowercase();
    for phrase in STOP_PHRASES {
        out = out.replace(phrase, "");
    }
    out.trim().to_string()
}

fn cap_words(text: &str, max_words: usize) -> String {
    text.split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts an explicit `as on DD/MM/YYYY` or `as on DD Month YYYY`
/// date, if present, else `None` (caller applies the `Default`
/// date-source confidence).
pub fn extract_as_on_date(query: &str) -> Option<NaiveDate> {
    if let Some(caps) = AS_ON_REGEX.captures(query) {
        let day: u32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let year: i32 = caps.get(3)?.as_str().parse().ok()?;
        let day = day.min(28).max(1);
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let caps = AS_ON_MONTH_NAME_REGEX.captures(query)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month_name = caps.get(2)?.as_str().to_lowercase();
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let month = MONTH_NAMES.iter().find(|(name, _)| *name == month_name)?.1;
    let day = day.min(28).max(1);
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn extract_explicit_sections(query: &str) -> Vec<String> {
    SECTION_REGEX
        .captures_iter(query)
        .map(|c| c[1].to_uppercase())
        .collect()
}

pub fn extract_explicit_case_ids(query: &str) -> Vec<String> {
    CASE_ID_REGEX
        .find_iter(query)
        .map(|m| m.as_str().to_uppercase())
        .collect()
}

pub fn extract_case_mentions(query: &str) -> Vec<(String, String)> {
    CASE_MENTION_REGEX
        .captures_iter(query)
        .map(|c| {
            let first = cap_words(&strip_stop_phrases(&c[1]), 8);
            let second = cap_words(&strip_stop_phrases(&c[2]), 8);
            (first, second)
        })
        .filter(|(a, b)| !a.is_empty() && !b.is_empty())
        .collect()
}

pub fn extract_citation_hints(query: &str) -> Vec<String> {
    CITATION_REGEX.find_iter(query).map(|m| m.as_str().to_string()).collect()
}

pub fn extract_legal_terms(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    LEGAL_SYNONYMS
        .keys()
        .filter(|term| lower.contains(*term))
        .map(|s| s.to_string())
        .collect()
}

/// Maps each extracted legal term to its synonym expansion, per the
/// `expanded_terms` field's `HashMap<term, synonyms>` representation.
pub fn expand_terms(terms: &[String]) -> HashMap<String, Vec<String>> {
    terms
        .iter()
        .map(|term| {
            let synonyms = LEGAL_SYNONYMS
                .get(term.as_str())
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default();
            (term.clone(), synonyms)
        })
        .collect()
}

pub fn guess_sections_from_offenses(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut guesses: Vec<String> = OFFENSE_SECTION_GUESSES
        .iter()
        .filter(|(offense, _)| lower.contains(*offense))
        .map(|(_, section)| section.to_string())
        .collect();
    guesses.sort();
    guesses.dedup();
    guesses
}

pub fn offense_keywords(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    OFFENSE_SECTION_GUESSES
        .keys()
        .filter(|offense| lower.contains(*offense))
        .map(|s| s.to_string())
        .collect()
}

/// Classifies the query in branch order:
/// comparative (has two distinct case mentions or "vs"/"compare"),
/// procedural (procedure/process keywords), factual (default when a
/// clear legal term or section is present), else ambiguous.
pub fn classify_query(query: &str, analysis: &QueryAnalysis) -> QueryType {
    let lower = query.to_lowercase();

    if analysis.case_mentions.len() >= 2
        || lower.contains("compare")
        || lower.contains(" vs ")
        || lower.contains("difference between")
    {
        return QueryType::Comparative;
    }

    const PROCEDURAL_KEYWORDS: &[&str] = &[
        "procedure", "process", "how to file", "steps to", "timeline", "limitation period",
    ];
    if PROCEDURAL_KEYWORDS.iter().any(|k| lower.contains(k)) && analysis.offense_keywords.is_empty() {
        return QueryType::Procedural;
    }

    if !analysis.offense_keywords.is_empty()
        || lower.contains("punishment")
        || lower.contains("sentence")
        || !analysis.legal_terms.is_empty()
        || !analysis.explicit_sections.is_empty()
        || !analysis.section_guesses.is_empty()
        || !analysis.explicit_case_ids.is_empty()
        || !analysis.case_mentions.is_empty()
    {
        return QueryType::Factual;
    }

    QueryType::Ambiguous
}

/// Runs the full query analysis pipeline over a raw query string.
/// `as_on_override` lets a caller supply an explicit as-on date from
/// a request field rather than parsed from free text.
pub fn analyze_query(query: &str) -> QueryAnalysis {
    let legal_terms = extract_legal_terms(query);
    let expanded_terms = expand_terms(&legal_terms);
    let section_guesses = guess_sections_from_offenses(query);
    let explicit_sections = extract_explicit_sections(query);
    let case_mentions = extract_case_mentions(query);
    let explicit_case_ids = extract_explicit_case_ids(query);
    let offense_keywords = offense_keywords(query);

    let mut analysis = QueryAnalysis {
        original_query: query.to_string(),
        temporal_context: None,
        expanded_terms,
        section_guesses,
        explicit_sections,
        case_mentions,
        explicit_case_ids,
        legal_terms,
        offense_keywords,
        query_type: None,
    };
    analysis.query_type = Some(classify_query(query, &analysis));
    analysis
}

/// True when the analysis found no legal term, section, offense guess,
/// case mention, or explicit case ID anywhere in the query.
fn has_legal_signal(analysis: &QueryAnalysis) -> bool {
    !analysis.legal_terms.is_empty()
        || !analysis.explicit_sections.is_empty()
        || !analysis.section_guesses.is_empty()
        || !analysis.explicit_case_ids.is_empty()
        || !analysis.case_mentions.is_empty()
        || !analysis.offense_keywords.is_empty()
}

/// Refuse the query outright: fewer than 3 tokens and no legal signal
/// at all.
pub fn should_refuse(analysis: &QueryAnalysis) -> bool {
    analysis.original_query.split_whitespace().count() < 3 && !has_legal_signal(analysis)
}

/// Builds the clarification prompt for a query that survives refusal but
/// is too unspecific to retrieve against: procedural/ambiguous queries
/// with no offense or section guess, and comparative queries naming
/// fewer than two provisions.
pub fn clarifying_question(analysis: &QueryAnalysis) -> Option<String> {
    match analysis.query_type {
        Some(QueryType::Comparative) if analysis.offense_keywords.len() < 2 => Some(
            "Which two provisions, sections, or cases would you like compared?".to_string(),
        ),
        Some(QueryType::Procedural) | Some(QueryType::Ambiguous)
            if analysis.section_guesses.is_empty() && analysis.explicit_sections.is_empty() =>
        {
            Some(
                "Could you name the specific offense, section, or case you're asking about?"
                    .to_string(),
            )
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_explicit_section_number() {
        let sections = extract_explicit_sections("What does Section 147 say about robbery?");
        assert_eq!(sections, vec!["147"]);
    }

    #[test]
    fn extracts_case_id() {
        let ids = extract_explicit_case_ids("See SC:2021:445 for the holding.");
        assert_eq!(ids, vec!["SC:2021:445"]);
    }

    #[test]
    fn extracts_case_mention_and_strips_stop_phrase() {
        let mentions = extract_case_mentions("As held in State of Punjab v. Baldev Singh, the rule applies.");
        assert_eq!(mentions.len(), 1);
        assert!(mentions[0].0.to_lowercase().contains("state of punjab"));
    }

    #[test]
    fn classifies_factual_query_with_legal_term() {
        let analysis = analyze_query("What is the punishment for robbery under the new code?");
        assert_eq!(analysis.query_type, Some(QueryType::Factual));
        assert!(!analysis.section_guesses.is_empty());
    }

    #[test]
    fn classifies_comparative_query() {
        let analysis = analyze_query("Compare Section 147 and Section 303 punishments.");
        assert_eq!(analysis.query_type, Some(QueryType::Comparative));
    }

    #[test]
    fn refuses_very_short_query_with_no_legal_signal() {
        let analysis = analyze_query("help me");
        assert_eq!(analysis.query_type, Some(QueryType::Ambiguous));
        assert!(should_refuse(&analysis));
    }

    #[test]
    fn asks_clarification_for_ambiguous_query_with_some_signal() {
        let analysis = analyze_query("what about the bail procedure here");
        assert!(!should_refuse(&analysis));
        assert!(clarifying_question(&analysis).is_some());
    }

    #[test]
    fn asks_which_provisions_for_underspecified_comparative_query() {
        let analysis = analyze_query("Compare Section 147 and theft.");
        assert_eq!(analysis.query_type, Some(QueryType::Comparative));
        assert!(clarifying_question(&analysis).is_some());
    }

    #[test]
    fn no_clarification_needed_for_well_specified_factual_query() {
        let analysis = analyze_query("What is the punishment for robbery under section 147?");
        assert!(clarifying_question(&analysis).is_none());
    }

    #[test]
    fn as_on_date_clamps_invalid_day() {
        let date = extract_as_on_date("as on 31/02/2024").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    }

    #[test]
    fn as_on_date_accepts_month_name_form() {
        let date = extract_as_on_date("as on 15 August 2023").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 8, 15).unwrap());
    }

    #[test]
    fn procedural_query_with_offense_keyword_classifies_factual() {
        let analysis = analyze_query("What is the procedure for filing a complaint about robbery?");
        assert_eq!(analysis.query_type, Some(QueryType::Factual));
    }

    #[test]
    fn bare_punishment_query_classifies_factual() {
        let analysis = analyze_query("what about punishment here");
        assert_eq!(analysis.query_type, Some(QueryType::Factual));
    }
}
