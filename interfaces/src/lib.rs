pub mod baseline;
pub mod defs;
pub mod empty;

pub use baseline::BaselineScoreTable;
pub use defs::{ScoreLookup, SourceSpec};
pub use empty::EmptyScoreTable;
