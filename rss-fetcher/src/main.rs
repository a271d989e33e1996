use anyhow::Context;
use clap::Parser;
use interfaces::BaselineScoreTable;
use rss_fetcher::{output, AppConfig, FeedParser, Fetcher, RssAggregator, ScoreLookup};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fetch the latest item of every configured security feed and write the
/// results as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Directory receiving rss_feeds.json and cyber_scores.json
    #[arg(long, env = "RSS_OUTPUT_DIR", default_value = "embassy-map/public")]
    output_dir: PathBuf,

    /// JSON file overriding the built-in sources and proxies
    #[arg(long, env = "RSS_SOURCES_FILE")]
    sources: Option<PathBuf>,

    /// Attempts per feed, each one direct request plus one proxy request
    #[arg(long, env = "RSS_MAX_ATTEMPTS", default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Per-request timeout in seconds
    #[arg(long, env = "RSS_TIMEOUT_SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Keep old rss_feeds_*.json snapshots
    #[arg(long)]
    skip_cleanup: bool,

    /// Also append log output to this file, e.g. rss_fetcher.log
    #[arg(long, env = "RSS_LOG_FILE")]
    log_file: Option<PathBuf>,
}

/// Console logging, plus a plain-text file layer when `log_file` is set.
///
/// The returned guard flushes the file writer on drop and must outlive the run.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("log file {} has no file name", path.display()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir).with_context(|| format!("creating log directory {}", dir.display()))?;

            let (writer, guard) = non_blocking(rolling::never(dir, file_name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;
    info!("Starting RSS fetcher");

    let mut config = AppConfig::builtin().context("building built-in source catalog")?;
    if let Some(path) = &cli.sources {
        config
            .load_sources_file(path)
            .with_context(|| format!("loading sources file {}", path.display()))?;
    }
    config.fetch.max_attempts = cli.max_attempts;
    config.fetch.timeout = Duration::from_secs(cli.timeout_secs);

    if !cli.skip_cleanup {
        // A failed cleanup must not prevent this run's output
        if let Err(e) = output::clean_old_feed_files(&cli.output_dir).await {
            error!("Failed to clean old feed snapshots: {}", e);
        }
    }

    let scores = Arc::new(BaselineScoreTable::new());
    let score_table = scores.scores_for(&config.catalog.ids());
    output::write_scores(&cli.output_dir, &score_table)
        .await
        .context("writing cyber scores")?;

    let fetcher = Fetcher::new(config.fetch.clone()).context("building HTTP client")?;
    let aggregator = RssAggregator::new(Arc::new(fetcher), FeedParser::new(), scores);

    let results = aggregator.run(config.catalog.sources()).await;
    let path = output::write_results(&cli.output_dir, &results)
        .await
        .context("writing feed results")?;

    info!("RSS fetcher finished, results in {}", path.display());
    Ok(())
}
