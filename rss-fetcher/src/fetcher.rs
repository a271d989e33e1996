use crate::traits::FeedRetriever;
use crate::types::{AttemptOutcome, FetchAttempt, FetchConfig, FetchOutcome, FetchStrategy, Result, Source};
use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Retrieval engine: direct request, then proxy rotation, bounded attempts.
///
/// The inner `reqwest::Client` is a connection pool; clone the `Fetcher` or
/// share it behind an `Arc` rather than building one per source.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch_feed(&self, source_id: &str, url: &str) -> FetchOutcome {
        let start_time = Instant::now();
        let fetch_time = Utc::now();
        let max_attempts = self.config.max_attempts;
        let mut attempts = Vec::new();
        let mut backoff = Constant::new(self.config.retry_delay);

        debug!("Fetching feed for {}: {}", source_id, url);

        for attempt in 0..max_attempts {
            if let Some(body) = self
                .attempt(source_id, attempt, FetchStrategy::Direct, url, &mut attempts)
                .await
            {
                return finish(Some(body), attempts, fetch_time, start_time);
            }

            if !self.config.proxies.is_empty() {
                let index = attempt as usize % self.config.proxies.len();
                let proxy_url = format!("{}{}", self.config.proxies[index], url);
                info!("Trying proxy {} for {}", proxy_url, source_id);

                if let Some(body) = self
                    .attempt(source_id, attempt, FetchStrategy::Proxy { index }, &proxy_url, &mut attempts)
                    .await
                {
                    return finish(Some(body), attempts, fetch_time, start_time);
                }
            }

            // No delay after the last attempt
            if attempt + 1 < max_attempts {
                if let Some(delay) = backoff.next_backoff() {
                    warn!("Attempt {}/{} failed for {}, retrying in {:?}", attempt + 1, max_attempts, source_id, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        error!("Failed to fetch feed for {} after {} attempts", source_id, max_attempts);
        finish(None, attempts, fetch_time, start_time)
    }

    async fn attempt(
        &self,
        source_id: &str,
        attempt: u32,
        strategy: FetchStrategy,
        url: &str,
        attempts: &mut Vec<FetchAttempt>,
    ) -> Option<String> {
        match self.request(url).await {
            Ok(body) => {
                info!("Fetched feed for {} via {:?} ({} bytes)", source_id, strategy, body.len());
                attempts.push(FetchAttempt {
                    attempt,
                    strategy,
                    outcome: AttemptOutcome::Status(StatusCode::OK.as_u16()),
                });
                Some(body)
            }
            Err(outcome) => {
                match &outcome {
                    AttemptOutcome::Status(status) => {
                        warn!("HTTP {} for {} via {:?}", status, source_id, strategy)
                    }
                    AttemptOutcome::Failed(reason) => {
                        warn!("Request failed for {} via {:?}: {}", source_id, strategy, reason)
                    }
                }
                attempts.push(FetchAttempt { attempt, strategy, outcome });
                None
            }
        }
    }

    async fn request(&self, url: &str) -> std::result::Result<String, AttemptOutcome> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, self.config.accept.as_str())
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| AttemptOutcome::Failed(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AttemptOutcome::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptOutcome::Failed(format!("reading body: {}", e)))
    }
}

fn finish(content: Option<String>, attempts: Vec<FetchAttempt>, fetch_time: chrono::DateTime<Utc>, start_time: Instant) -> FetchOutcome {
    FetchOutcome {
        content,
        attempts,
        fetch_time,
        response_time_ms: start_time.elapsed().as_millis() as u64,
    }
}

#[async_trait]
impl FeedRetriever for Fetcher {
    async fn retrieve(&self, source: &Source) -> FetchOutcome {
        self.fetch_feed(&source.id, &source.url).await
    }
}
