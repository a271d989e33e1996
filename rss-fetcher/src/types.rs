use chrono::{DateTime, Utc};
use serde::ser::{Serialize, Serializer};
use std::time::Duration;
// Use the interfaces crate for collaborator contracts
pub use interfaces::defs::{ScoreLookup, SourceSpec};

pub type Source = SourceSpec;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; RSSFetcher/1.0)";
pub const DEFAULT_ACCEPT: &str = "application/xml, application/json, text/plain, */*";

pub const DEFAULT_PROXIES: &[&str] = &[
    "https://api.allorigins.win/raw?url=",
    "https://corsproxy.io/?",
    "https://cors-anywhere.herokuapp.com/",
    "https://api.codetabs.com/v1/proxy?quest=",
];

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub accept: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// URL prefixes; the target URL is appended verbatim.
    pub proxies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            retry_delay: Duration::from_millis(500),
            proxies: DEFAULT_PROXIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    Direct,
    Proxy { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Status(u16),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub attempt: u32,
    pub strategy: FetchStrategy,
    pub outcome: AttemptOutcome,
}

impl FetchAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Status(200)
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub content: Option<String>,
    pub attempts: Vec<FetchAttempt>,
    pub fetch_time: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl FetchOutcome {
    /// The attempt that produced the content, if any.
    pub fn winning_attempt(&self) -> Option<&FetchAttempt> {
        self.content.as_ref().and_then(|_| self.attempts.iter().rev().find(|a| a.succeeded()))
    }

    /// Attempts started. One attempt can make several requests (direct, then proxy).
    pub fn rounds(&self) -> usize {
        self.attempts.last().map_or(0, |a| a.attempt as usize + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
    Unknown,
}

/// Raw fields of a candidate item, only alive while a document is being parsed.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub raw_date: Option<String>,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: String,
    pub last_fetched: DateTime<Utc>,
    /// Set when `pub_date` matched no known format and ranking used the parse time.
    pub date_fallback: bool,
    #[serde(rename = "cyberScore", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl NormalizedRecord {
    pub fn is_valid(&self) -> bool {
        let non_empty = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.is_empty());
        non_empty(&self.title) || non_empty(&self.description)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult {
    Success(NormalizedRecord),
    FetchError {
        attempts: usize,
        last_fetched: DateTime<Utc>,
    },
    ParseError {
        error: ParseError,
        last_fetched: DateTime<Utc>,
    },
}

impl SourceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SourceResult::Success(_))
    }

    pub fn record(&self) -> Option<&NormalizedRecord> {
        match self {
            SourceResult::Success(record) => Some(record),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceResult::Success(_) => "Success",
            SourceResult::FetchError { .. } => "FetchError",
            SourceResult::ParseError { error, .. } => error.kind(),
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureView<'a> {
    error: String,
    kind: &'a str,
    last_fetched: &'a DateTime<Utc>,
}

// Flat shape for persistence: a record's fields, or {error, kind, lastFetched}.
impl Serialize for SourceResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            SourceResult::Success(record) => record.serialize(serializer),
            SourceResult::FetchError { attempts, last_fetched } => FailureView {
                error: format!("Unable to retrieve the feed after {} attempts", attempts),
                kind: self.kind(),
                last_fetched,
            }
            .serialize(serializer),
            SourceResult::ParseError { error, last_fetched } => FailureView {
                error: format!("Unable to parse the feed: {}", error),
                kind: self.kind(),
                last_fetched,
            }
            .serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty content")]
    EmptyContent,

    #[error("malformed XML: {0}")]
    MalformedContent(String),

    #[error("no item or entry elements with a date")]
    EmptyFeed,

    #[error("selected item has neither title nor description")]
    NoValidItem,
}

impl ParseError {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::EmptyContent => "EmptyContent",
            ParseError::MalformedContent(_) => "MalformedContent",
            ParseError::EmptyFeed => "EmptyFeed",
            ParseError::NoValidItem => "NoValidItem",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn request(attempt: u32, strategy: FetchStrategy) -> FetchAttempt {
        FetchAttempt {
            attempt,
            strategy,
            outcome: AttemptOutcome::Status(503),
        }
    }

    #[test]
    fn rounds_counts_attempts_not_requests() {
        let mut outcome = FetchOutcome {
            content: None,
            attempts: Vec::new(),
            fetch_time: Utc::now(),
            response_time_ms: 0,
        };
        assert_eq!(outcome.rounds(), 0);

        outcome.attempts = vec![
            request(0, FetchStrategy::Direct),
            request(0, FetchStrategy::Proxy { index: 0 }),
            request(1, FetchStrategy::Direct),
            request(1, FetchStrategy::Proxy { index: 1 }),
        ];
        assert_eq!(outcome.rounds(), 2);
    }

    #[test]
    fn fetch_error_message_reports_attempts() {
        let result = SourceResult::FetchError {
            attempts: 2,
            last_fetched: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error"], "Unable to retrieve the feed after 2 attempts");
    }
}
