//! Temporal Reasoner.
//!
//! Resolves the as-on date used to gate statute validity, attaches a
//! confidence score reflecting how that date was derived, and attaches
//! legacy-act mappings to statute results.

use chrono::{Datelike, NaiveDate, Utc};
use legal_rag_core::{DateSource, LegacyMapping, MappingType, ResultMetadata, TemporalContext};

use legal_rag_config::LegacyMappingTable;

use crate::query_analysis::extract_as_on_date;

pub const CONFIDENCE_EXPLICIT: f32 = 0.9;
pub const CONFIDENCE_ACTS_INFERENCE: f32 = 0.7;
pub const CONFIDENCE_INFERRED_YEAR: f32 = 0.5;
pub const CONFIDENCE_DEFAULT: f32 = 0.2;

static YEAR_REGEX_FALLBACK_WINDOW: i32 = 5;

/// Acts whose bare mention alongside a bare year resolves the as-on date
/// to the act's own commencement date rather than January 1st of that
/// year, e.g. "2023" co-occurring with "Bharatiya Nyaya Sanhita".
const ACT_EFFECTIVE_DATES: &[(&str, (i32, u32, u32))] = &[
    ("bharatiya nyaya sanhita", (2024, 7, 1)),
    ("bns", (2024, 7, 1)),
    ("bharatiya nagarik suraksha sanhita", (2024, 7, 1)),
    ("bnss", (2024, 7, 1)),
    ("bharatiya sakshya adhiniyam", (2024, 7, 1)),
    ("bsa", (2024, 7, 1)),
];

/// A bare year alone doesn't trigger acts-inference; the year must
/// co-occur with a recognized act name in the same query text.
fn detect_acts_inference_date(query: &str) -> Option<NaiveDate> {
    extract_bare_year(query)?;
    let lower = query.to_lowercase();
    let (_, (y, m, d)) = ACT_EFFECTIVE_DATES.iter().find(|(alias, _)| lower.contains(alias))?;
    NaiveDate::from_ymd_opt(*y, *m, *d)
}

/// Resolves the as-on date for a query, in priority order:
/// 1. An explicit `as on DD/MM/YYYY` or `as on DD Month YYYY` phrase.
/// 2. A bare year co-occurring with a named act, resolved to that act's
///    effective date (`detect_acts_inference_date`).
/// 3. A bare four-digit year mentioned in the query, if within
///    `YEAR_REGEX_FALLBACK_WINDOW` of the current year, resolved to
///    31 December of that year.
/// 4. Today's date, with the lowest confidence tier.
pub fn resolve_temporal_context(query: &str, today: NaiveDate) -> TemporalContext {
    if let Some(date) = extract_as_on_date(query) {
        return TemporalContext {
            as_on_date: date,
            date_source: DateSource::Explicit,
            confidence: CONFIDENCE_EXPLICIT,
        };
    }

    if let Some(date) = detect_acts_inference_date(query) {
        return TemporalContext {
            as_on_date: date,
            date_source: DateSource::ActsInference,
            confidence: CONFIDENCE_ACTS_INFERENCE,
        };
    }

    if let Some(year) = extract_bare_year(query) {
        if (year - today.year()).abs() <= YEAR_REGEX_FALLBACK_WINDOW {
            if let Some(date) = NaiveDate::from_ymd_opt(year, 12, 31) {
                return TemporalContext {
                    as_on_date: date,
                    date_source: DateSource::InferredYear,
                    confidence: CONFIDENCE_INFERRED_YEAR,
                };
            }
        }
    }

    TemporalContext {
        as_on_date: today,
        date_source: DateSource::Default,
        confidence: CONFIDENCE_DEFAULT,
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn extract_bare_year(query: &str) -> Option<i32> {
    let re = regex::Regex::new(r"\b(19|20)\d{2}\b").unwrap();
    re.find(query)?.as_str().parse().ok()
}

/// A statute chunk whose validity window doesn't contain `as_on_date`
/// is gated out entirely. Case results are permissive: unknown decision
/// dates pass, and known dates must not postdate `as_on_date`.
pub fn statute_passes_validity(
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
    as_on_date: NaiveDate,
) -> bool {
    if let Some(from) = effective_from {
        if from > as_on_date {
            return false;
        }
    }
    if let Some(to) = effective_to {
        if to <= as_on_date {
            return false;
        }
    }
    true
}

pub fn case_passes_validity(decision_date: Option<NaiveDate>, as_on_date: NaiveDate) -> bool {
    match decision_date {
        Some(decided) => decided <= as_on_date,
        None => true,
    }
}

/// Attaches legacy-act mappings to a statute's metadata, looked up by
/// `section_no`, converting the config-layer row shape into the
/// core model's `LegacyMapping`.
pub fn attach_legacy_mappings(
    metadata: &mut ResultMetadata,
    section_no: &str,
    table: &LegacyMappingTable,
) {
    let Some(rows) = table.lookup(section_no) else {
        return;
    };
    metadata.legacy_mappings = rows
        .iter()
        .map(|row| LegacyMapping {
            bns_section: row.bns_section.clone(),
            legacy_act: row.legacy_act.clone(),
            legacy_section: row.legacy_section.clone(),
            mapping_type: match row.mapping_type.as_str() {
                "equivalent" => MappingType::Equivalent,
                "partial" => MappingType::Partial,
                _ => MappingType::Related,
            },
            notes: row.notes.clone(),
        })
        .collect();
}
