use crate::types::{FetchOutcome, Source};
use async_trait::async_trait;

/// Trait for retrieving raw feed documents (HTTP, fixtures, etc.)
#[async_trait]
pub trait FeedRetriever: Send + Sync {
    /// Fetch the raw document for one source.
    ///
    /// Exhausting every attempt is an ordinary outcome without content, not
    /// an error, so one source can never abort its siblings.
    async fn retrieve(&self, source: &Source) -> FetchOutcome;
}
