use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: String,
    pub url: String,
}

// Object style note:
// Score tables are static lookups consulted once per successfully parsed
// source. Implementations must be pure and cheap, since the core calls them
// from inside concurrently running per-source pipelines.

pub trait ScoreLookup: Send + Sync {
    fn score_for(&self, source_id: &str) -> Option<f64>;

    fn scores_for(&self, source_ids: &[&str]) -> BTreeMap<String, f64> {
        source_ids
            .iter()
            .filter_map(|id| self.score_for(id).map(|score| ((*id).to_owned(), score)))
            .collect()
    }
}
