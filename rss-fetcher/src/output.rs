use crate::types::{Result, SourceResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

pub const FEEDS_FILE: &str = "rss_feeds.json";
pub const SCORES_FILE: &str = "cyber_scores.json";

const SNAPSHOT_PREFIX: &str = "rss_feeds_";
const SNAPSHOT_SUFFIX: &str = ".json";

async fn write_json<T: Serialize + ?Sized>(dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).await?;
    Ok(path)
}

/// Write the per-source results as `rss_feeds.json` in `dir`.
pub async fn write_results(dir: &Path, results: &BTreeMap<String, SourceResult>) -> Result<PathBuf> {
    let path = write_json(dir, FEEDS_FILE, results).await?;
    info!("Saved {} feed results to {}", results.len(), path.display());
    Ok(path)
}

/// Write the score table as `cyber_scores.json` in `dir`.
pub async fn write_scores(dir: &Path, scores: &BTreeMap<String, f64>) -> Result<PathBuf> {
    let path = write_json(dir, SCORES_FILE, scores).await?;
    info!("Saved {} cyber scores to {}", scores.len(), path.display());
    Ok(path)
}

/// Remove every `rss_feeds_*.json` snapshot except the newest one.
///
/// Snapshot names embed a sortable timestamp, so "newest" is the
/// lexicographically greatest name. Returns how many files were removed.
pub async fn clean_old_feed_files(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).await?;

    let mut snapshots = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX) {
            snapshots.push(name);
        }
    }

    if snapshots.len() <= 1 {
        info!("No old feed snapshots to remove in {}", dir.display());
        return Ok(0);
    }

    snapshots.sort_unstable_by(|a, b| b.cmp(a));
    let latest = &snapshots[0];
    info!("Keeping newest feed snapshot {}", latest);

    let mut removed = 0;
    for old in &snapshots[1..] {
        match fs::remove_file(dir.join(old)).await {
            Ok(()) => {
                info!("Removed old feed snapshot {}", old);
                removed += 1;
            }
            Err(e) => error!("Failed to remove {}: {}", old, e),
        }
    }

    Ok(removed)
}
