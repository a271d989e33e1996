use crate::defs::ScoreLookup;

pub struct EmptyScoreTable;

impl ScoreLookup for EmptyScoreTable {
    fn score_for(&self, _source_id: &str) -> Option<f64> {
        // No table, no enrichment.
        None
    }
}
