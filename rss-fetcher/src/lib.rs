pub mod types;
pub mod traits;
pub mod rss_utils;
pub mod xml;
pub mod parser;
pub mod fetcher;
pub mod aggregator;
pub mod config;
pub mod output;

pub use types::*;
pub use traits::FeedRetriever;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use aggregator::RssAggregator;
pub use config::{AppConfig, SourceCatalog};
