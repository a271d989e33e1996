use crate::parser::FeedParser;
use crate::traits::FeedRetriever;
use crate::types::{ScoreLookup, Source, SourceResult};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// Runs retrieval and parsing for every source concurrently and joins the
/// per-source results into one mapping.
pub struct RssAggregator {
    retriever: Arc<dyn FeedRetriever>,
    parser: FeedParser,
    scores: Arc<dyn ScoreLookup>,
}

impl RssAggregator {
    pub fn new(retriever: Arc<dyn FeedRetriever>, parser: FeedParser, scores: Arc<dyn ScoreLookup>) -> Self {
        Self {
            retriever,
            parser,
            scores,
        }
    }

    /// Process all sources and wait for every one of them.
    ///
    /// The result has one entry per distinct source id. If an id is listed
    /// twice the later source wins.
    pub async fn run(&self, sources: &[Source]) -> BTreeMap<String, SourceResult> {
        info!("Processing {} feeds", sources.len());

        let tasks = sources.iter().map(|source| {
            let span = info_span!("source", id = %source.id);
            async move { (source.id.clone(), self.process_source(source).await) }.instrument(span)
        });

        let mut results = BTreeMap::new();
        for (id, result) in join_all(tasks).await {
            if results.insert(id.clone(), result).is_some() {
                warn!("Duplicate source id {}, keeping the last result", id);
            }
        }

        let successes = results.values().filter(|r| r.is_success()).count();
        let fetch_errors = results
            .values()
            .filter(|r| matches!(r, SourceResult::FetchError { .. }))
            .count();
        let parse_errors = results.len() - successes - fetch_errors;
        info!(
            "Finished {} feeds: {} succeeded, {} fetch errors, {} parse errors",
            results.len(),
            successes,
            fetch_errors,
            parse_errors
        );

        results
    }

    /// One source's pipeline. Every failure ends up as a result variant.
    pub async fn process_source(&self, source: &Source) -> SourceResult {
        let outcome = self.retriever.retrieve(source).await;

        debug!(
            "Retrieval for {} took {} ms ({} attempts, {} requests)",
            source.id,
            outcome.response_time_ms,
            outcome.rounds(),
            outcome.attempts.len()
        );

        let content = match outcome.content {
            Some(content) => content,
            None => {
                return SourceResult::FetchError {
                    attempts: outcome.rounds(),
                    last_fetched: outcome.fetch_time,
                }
            }
        };

        match self.parser.parse(&content, &source.id, &source.url) {
            Ok(mut record) => {
                record.score = self.scores.score_for(&source.id);
                if record.date_fallback {
                    warn!("{}: selected item has an unrecognised date {:?}", source.id, record.pub_date);
                }
                SourceResult::Success(record)
            }
            Err(error) => {
                warn!("Parse failed for {}: {}", source.id, error);
                SourceResult::ParseError {
                    error,
                    last_fetched: chrono::Utc::now(),
                }
            }
        }
    }
}
