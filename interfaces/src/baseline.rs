use std::collections::BTreeMap;

use crate::defs::ScoreLookup;

// Source identifiers are country names in English; the index keys them by the
// names published in the ITU Global Cybersecurity Index.
const COUNTRY_MAPPING: &[(&str, &str)] = &[
    ("United States", "USA"),
    ("Germany", "Germany"),
    ("United Kingdom", "United Kingdom"),
    ("Japan", "Japan"),
    ("Russia", "Russian Federation"),
    ("Brazil", "Brazil"),
    ("Spain", "Spain"),
    ("Italy", "Italy"),
    ("Egypt", "Egypt"),
    ("South Korea", "Republic of Korea"),
    ("India", "India"),
    ("Canada", "Canada"),
    ("Thailand", "Thailand"),
    ("Vietnam", "Vietnam"),
];

// GCI 2023, out of 100.
const GCI_SCORES: &[(&str, f64)] = &[
    ("USA", 100.0),
    ("United Kingdom", 99.54),
    ("Germany", 98.52),
    ("Canada", 97.49),
    ("Japan", 97.49),
    ("Republic of Korea", 97.49),
    ("Spain", 96.46),
    ("Italy", 95.43),
    ("Brazil", 94.40),
    ("India", 93.37),
    ("Russian Federation", 92.34),
    ("Egypt", 91.31),
    ("Thailand", 90.28),
    ("Vietnam", 89.25),
];

pub struct BaselineScoreTable {
    country_mapping: BTreeMap<&'static str, &'static str>,
    scores: BTreeMap<&'static str, f64>,
}

impl BaselineScoreTable {
    pub fn new() -> Self {
        Self {
            country_mapping: COUNTRY_MAPPING.iter().copied().collect(),
            scores: GCI_SCORES.iter().copied().collect(),
        }
    }
}

impl Default for BaselineScoreTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreLookup for BaselineScoreTable {
    fn score_for(&self, source_id: &str) -> Option<f64> {
        let index_name = self.country_mapping.get(source_id)?;
        self.scores.get(index_name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_country_names_to_index_names() {
        let table = BaselineScoreTable::new();
        assert_eq!(table.score_for("United States"), Some(100.0));
        assert_eq!(table.score_for("South Korea"), Some(97.49));
        assert_eq!(table.score_for("Russia"), Some(92.34));
    }

    #[test]
    fn unknown_country_has_no_score() {
        let table = BaselineScoreTable::new();
        assert_eq!(table.score_for("France"), None);
        assert_eq!(table.score_for("USA"), None);
    }

    #[test]
    fn scores_for_skips_unknown_ids() {
        let table = BaselineScoreTable::new();
        let scores = table.scores_for(&["Germany", "France", "Japan"]);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get("Germany"), Some(&98.52));
        assert_eq!(scores.get("Japan"), Some(&97.49));
    }

    #[test]
    fn every_mapped_country_has_a_score() {
        let table = BaselineScoreTable::new();
        for (country, _) in COUNTRY_MAPPING {
            assert!(table.score_for(country).is_some(), "no score for {}", country);
        }
    }
}
