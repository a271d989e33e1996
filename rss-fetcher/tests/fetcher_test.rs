use mockito::{Matcher, Server};
use rss_fetcher::{AttemptOutcome, FeedRetriever, FetchConfig, FetchStrategy, Fetcher, Source};
use std::sync::Once;
use std::time::{Duration, Instant};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn test_config(proxies: Vec<String>) -> FetchConfig {
    FetchConfig {
        retry_delay: Duration::from_millis(10),
        proxies,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_proxy_fallback_after_direct_503() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server.mock("GET", "/feed").with_status(503).expect(1).create_async().await;
    let proxy = server
        .mock("GET", Matcher::Regex(r"^/proxy".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("B")
        .expect(1)
        .create_async()
        .await;

    let fetcher = Fetcher::new(test_config(vec![format!("{}/proxy?url=", server.url())])).unwrap();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert_eq!(outcome.content.as_deref(), Some("B"));
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].strategy, FetchStrategy::Direct);
    assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::Status(503));
    let winner = outcome.winning_attempt().unwrap();
    assert_eq!(winner.strategy, FetchStrategy::Proxy { index: 0 });
    assert_eq!(winner.attempt, 0);

    direct.assert_async().await;
    proxy.assert_async().await;
}

#[tokio::test]
async fn test_direct_success_skips_proxies() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server
        .mock("GET", "/feed")
        .match_header("accept", "application/xml, application/json, text/plain, */*")
        .with_status(200)
        .with_body("<rss/>")
        .expect(1)
        .create_async()
        .await;
    let proxy = server
        .mock("GET", Matcher::Regex(r"^/proxy".to_string()))
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let fetcher = Fetcher::new(test_config(vec![format!("{}/proxy?url=", server.url())])).unwrap();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert_eq!(outcome.content.as_deref(), Some("<rss/>"));
    assert_eq!(outcome.attempts.len(), 1);
    assert!(outcome.attempts[0].succeeded());

    direct.assert_async().await;
    proxy.assert_async().await;
}

#[tokio::test]
async fn test_exhaustion_rotates_proxies_and_returns_no_content() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server.mock("GET", "/feed").with_status(503).expect(2).create_async().await;
    let proxy_a = server
        .mock("GET", Matcher::Regex(r"^/proxy-a".to_string()))
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let proxy_b = server
        .mock("GET", Matcher::Regex(r"^/proxy-b".to_string()))
        .match_query(Matcher::Any)
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let proxies = vec![
        format!("{}/proxy-a?url=", server.url()),
        format!("{}/proxy-b?url=", server.url()),
    ];
    let fetcher = Fetcher::new(test_config(proxies)).unwrap();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert!(outcome.content.is_none());
    assert!(outcome.winning_attempt().is_none());
    let strategies: Vec<(u32, FetchStrategy)> = outcome.attempts.iter().map(|a| (a.attempt, a.strategy)).collect();
    assert_eq!(
        strategies,
        vec![
            (0, FetchStrategy::Direct),
            (0, FetchStrategy::Proxy { index: 0 }),
            (1, FetchStrategy::Direct),
            (1, FetchStrategy::Proxy { index: 1 }),
        ]
    );
    assert_eq!(outcome.attempts[1].outcome, AttemptOutcome::Status(500));
    assert_eq!(outcome.attempts[3].outcome, AttemptOutcome::Status(403));

    direct.assert_async().await;
    proxy_a.assert_async().await;
    proxy_b.assert_async().await;
}

#[tokio::test]
async fn test_empty_proxy_list_only_tries_direct() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server.mock("GET", "/feed").with_status(404).expect(3).create_async().await;

    let config = FetchConfig {
        max_attempts: 3,
        ..test_config(Vec::new())
    };
    let fetcher = Fetcher::new(config).unwrap();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert!(outcome.content.is_none());
    assert_eq!(outcome.attempts.len(), 3);
    assert!(outcome.attempts.iter().all(|a| a.strategy == FetchStrategy::Direct));

    direct.assert_async().await;
}

#[tokio::test]
async fn test_non_200_success_codes_are_failures() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server.mock("GET", "/feed").with_status(204).expect(1).create_async().await;

    let config = FetchConfig {
        max_attempts: 1,
        ..test_config(Vec::new())
    };
    let outcome = Fetcher::new(config).unwrap().fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert!(outcome.content.is_none());
    assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::Status(204));
    direct.assert_async().await;
}

#[tokio::test]
async fn test_connection_failure_is_recorded() {
    init_tracing();
    let config = FetchConfig {
        max_attempts: 1,
        ..test_config(Vec::new())
    };
    let fetcher = Fetcher::new(config).unwrap();
    let outcome = fetcher.fetch_feed("Offline", "http://127.0.0.1:1/feed").await;

    assert!(outcome.content.is_none());
    assert_eq!(outcome.attempts.len(), 1);
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(_)));
}

#[tokio::test]
async fn test_waits_between_attempts() {
    init_tracing();
    let mut server = Server::new_async().await;
    let _direct = server.mock("GET", "/feed").with_status(503).expect(2).create_async().await;

    let config = FetchConfig {
        retry_delay: Duration::from_millis(200),
        ..test_config(Vec::new())
    };
    let fetcher = Fetcher::new(config).unwrap();

    let started = Instant::now();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert!(outcome.content.is_none());
    assert_eq!(outcome.attempts.len(), 2);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_no_wait_after_final_attempt() {
    init_tracing();
    let mut server = Server::new_async().await;
    let direct = server.mock("GET", "/feed").with_status(503).expect(1).create_async().await;

    let config = FetchConfig {
        max_attempts: 1,
        retry_delay: Duration::from_secs(5),
        ..test_config(Vec::new())
    };
    let fetcher = Fetcher::new(config).unwrap();

    let started = Instant::now();
    let outcome = fetcher.fetch_feed("Test", &format!("{}/feed", server.url())).await;

    assert!(outcome.content.is_none());
    assert_eq!(outcome.rounds(), 1);
    assert!(started.elapsed() < Duration::from_secs(2), "slept after the last attempt");
    direct.assert_async().await;
}

#[tokio::test]
async fn test_retriever_trait_uses_source_url() {
    init_tracing();
    let mut server = Server::new_async().await;
    let mock = server.mock("GET", "/alerts.xml").with_status(200).with_body("ok").create_async().await;

    let fetcher = Fetcher::new(test_config(Vec::new())).unwrap();
    let source = Source {
        id: "Canada".to_string(),
        url: format!("{}/alerts.xml", server.url()),
    };
    let outcome = fetcher.retrieve(&source).await;

    assert_eq!(outcome.content.as_deref(), Some("ok"));
    mock.assert_async().await;
}
