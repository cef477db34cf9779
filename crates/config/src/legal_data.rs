//! Externalized legal domain data: the synonym table, the offense→section
//! guess table, and the legacy-mapping file contract.
//!
//! These are embedded as static tables rather than loaded from disk at
//! startup to keep the retrieval core's reference tests hermetic; a
//! deployment can still override them by constructing `LegalData` from a
//! loaded JSON/YAML file via `LegalData::from_tables`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Curated synonym table, case-folded, multi-word entries treated as
/// phrases. Recovered from the original corpus's `LEGAL_SYNONYMS` table.
pub static LEGAL_SYNONYMS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        (
            "bail",
            vec![
                "anticipatory bail",
                "pre-arrest bail",
                "section 438",
                "regular bail",
                "default bail",
                "surety",
                "custody",
            ],
        ),
        (
            "482",
            vec!["section 482", "482 crpc", "quash", "inherent powers"],
        ),
        (
            "electronic",
            vec!["section 65b", "electronic record"],
        ),
        (
            "writ",
            vec!["mandamus", "certiorari", "prohibition", "quo warranto"],
        ),
        (
            "robbery",
            vec!["dacoity", "armed theft", "extortion", "snatching"],
        ),
        (
            "murder",
            vec!["homicide", "culpable homicide", "killing"],
        ),
        ("theft", vec!["stealing", "larceny"]),
        (
            "cheating",
            vec!["fraud", "deception", "misrepresentation"],
        ),
        (
            "breach of trust",
            vec!["criminal breach of trust", "misappropriation"],
        ),
        (
            "rape",
            vec!["sexual assault", "sexual offence"],
        ),
        (
            "wrongful restraint",
            vec!["criminal intimidation", "wrongful confinement"],
        ),
        (
            "kidnapping",
            vec!["abduction"],
        ),
        (
            "dowry death",
            vec!["dowry harassment", "section 304b"],
        ),
        (
            "fir",
            vec!["first information report", "first info report"],
        ),
        (
            "evidence",
            vec!["testimony", "deposition", "exhibit"],
        ),
        (
            "sentence",
            vec!["punishment", "imprisonment", "penalty"],
        ),
        (
            "appeal",
            vec!["revision", "appellate"],
        ),
        (
            "warrant",
            vec!["summons", "non-bailable warrant"],
        ),
        (
            "confession",
            vec!["admission", "statement"],
        ),
        (
            "negligence",
            vec!["rash act", "rash and negligent"],
        ),
        (
            "forgery",
            vec!["fabrication", "counterfeit"],
        ),
        (
            "assault",
            vec!["criminal force", "battery"],
        ),
        (
            "conspiracy",
            vec!["criminal conspiracy", "abetment"],
        ),
        (
            "public servant",
            vec!["government official", "government servant"],
        ),
        (
            "possession",
            vec!["custody", "control"],
        ),
        (
            "extortion",
            vec!["robbery", "coercion"],
        ),
        (
            "bribery",
            vec!["corruption", "illegal gratification"],
        ),
        (
            "trespass",
            vec!["criminal trespass", "house trespass"],
        ),
        (
            "defamation",
            vec!["libel", "slander"],
        ),
    ])
});

/// Offense keyword → canonical statute section guess.
pub static OFFENSE_SECTION_GUESSES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("robbery", "BNS:2023:Sec:147"),
        ("dacoity", "BNS:2023:Sec:149"),
        ("murder", "BNS:2023:Sec:101"),
        ("homicide", "BNS:2023:Sec:103"),
        ("culpable homicide", "BNS:2023:Sec:103"),
        ("theft", "BNS:2023:Sec:303"),
        ("cheating", "BNS:2023:Sec:356"),
        ("criminal breach of trust", "BNS:2023:Sec:357"),
        ("breach of trust", "BNS:2023:Sec:357"),
        ("rape", "BNS:2023:Sec:63"),
        ("sexual assault", "BNS:2023:Sec:63"),
        ("wrongful restraint", "BNS:2023:Sec:351"),
        ("criminal intimidation", "BNS:2023:Sec:351"),
        ("kidnapping", "BNS:2023:Sec:133"),
        ("dowry death", "BNS:2023:Sec:111"),
    ])
});

/// A single row from the legacy mapping file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyMappingRow {
    pub bns_section: String,
    pub legacy_act: String,
    pub legacy_section: String,
    pub mapping_type: String,
    pub notes: Option<String>,
}

/// Lookup table for the legacy-mapping attachment step, keyed by
/// `section_no`. Built once at startup from a loaded JSON array.
#[derive(Debug, Clone, Default)]
pub struct LegacyMappingTable {
    by_section: HashMap<String, Vec<LegacyMappingRow>>,
}

impl LegacyMappingTable {
    pub fn from_rows(rows: Vec<LegacyMappingRow>) -> Self {
        let mut by_section: HashMap<String, Vec<LegacyMappingRow>> = HashMap::new();
        for row in rows {
            by_section
                .entry(row.bns_section.clone())
                .or_default()
                .push(row);
        }
        Self { by_section }
    }

    pub fn lookup(&self, section_no: &str) -> Option<&[LegacyMappingRow]> {
        self.by_section.get(section_no).map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonym_table_has_expected_seed_entries() {
        assert!(LEGAL_SYNONYMS.contains_key("bail"));
        assert!(LEGAL_SYNONYMS["482"].contains(&"quash"));
    }

    #[test]
    fn offense_guesses_cover_seed_offenses() {
        assert_eq!(OFFENSE_SECTION_GUESSES["robbery"], "BNS:2023:Sec:147");
        assert_eq!(OFFENSE_SECTION_GUESSES["murder"], "BNS:2023:Sec:101");
        assert_eq!(OFFENSE_SECTION_GUESSES["theft"], "BNS:2023:Sec:303");
    }

    #[test]
    fn legacy_mapping_table_looks_up_by_section() {
        let table = LegacyMappingTable::from_rows(vec![LegacyMappingRow {
            bns_section: "147".into(),
            legacy_act: "IPC:1860".into(),
            legacy_section: "392".into(),
            mapping_type: "equivalent".into(),
            notes: None,
        }]);
        assert_eq!(table.lookup("147").unwrap().len(), 1);
        assert!(table.lookup("999").is_none());
    }
}
