//! Crawl statistics
//!
//! A [`CrawlStatistics`] is a point-in-time snapshot taken from the registry,
//! usually once the crawl has gone idle.

use crate::state::AssetState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// When the registry was created
    pub started_at: DateTime<Utc>,

    /// When the crawl went idle; None while still running
    pub finished_at: Option<DateTime<Utc>>,

    /// Seed URLs submitted by the caller
    pub seeds: u64,

    /// Distinct URLs known to the registry, seeds included
    pub discovered: u64,

    /// URLs whose download succeeded
    pub downloaded: u64,

    /// URLs that were given up on
    pub failed: u64,

    /// Automatic retries scheduled
    pub retries: u64,

    /// Files written to the mirror directory
    pub files_written: u64,

    /// Bytes written to the mirror directory
    pub bytes_written: u64,

    /// Downloads that succeeded but could not be written
    pub write_errors: u64,

    /// Downloads not written because another URL already owns their file
    pub path_collisions: u64,

    /// Count of assets by state
    pub assets_by_state: HashMap<AssetState, u64>,

    /// URLs currently in the failed state, sorted
    pub failed_urls: Vec<String>,
}

impl CrawlStatistics {
    /// Creates an empty snapshot for a crawl started at `started_at`
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            seeds: 0,
            discovered: 0,
            downloaded: 0,
            failed: 0,
            retries: 0,
            files_written: 0,
            bytes_written: 0,
            write_errors: 0,
            path_collisions: 0,
            assets_by_state: HashMap::new(),
            failed_urls: Vec::new(),
        }
    }

    /// Wall-clock duration, up to now if the crawl has not finished
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Number of assets in `state`
    pub fn count(&self, state: AssetState) -> u64 {
        self.assets_by_state.get(&state).copied().unwrap_or(0)
    }

    fn count_where(&self, predicate: impl Fn(&AssetState) -> bool) -> u64 {
        self.assets_by_state
            .iter()
            .filter(|(state, _)| predicate(state))
            .map(|(_, count)| *count)
            .sum()
    }

    /// Assets with no download running
    pub fn settled(&self) -> u64 {
        self.count_where(AssetState::is_settled)
    }

    /// Assets whose last download succeeded
    pub fn succeeded(&self) -> u64 {
        self.count_where(AssetState::is_success)
    }

    /// Assets whose last download failed
    pub fn errored(&self) -> u64 {
        self.count_where(AssetState::is_error)
    }

    /// Percentage of discovered URLs that were downloaded
    pub fn success_rate(&self) -> f64 {
        if self.discovered == 0 {
            return 0.0;
        }
        (self.succeeded() as f64 / self.discovered as f64) * 100.0
    }
}

/// Formats statistics as a human-readable block
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    out.push_str("=== Mirror Statistics ===\n\n");

    out.push_str("Run:\n");
    out.push_str(&format!("  Started: {}\n", stats.started_at.to_rfc3339()));
    match stats.finished_at {
        Some(finished) => out.push_str(&format!("  Finished: {}\n", finished.to_rfc3339())),
        None => out.push_str("  Finished: (running)\n"),
    }
    let duration = stats.duration();
    out.push_str(&format!(
        "  Duration: {}.{:03}s\n\n",
        duration.num_seconds(),
        duration.num_milliseconds().rem_euclid(1000)
    ));

    out.push_str("Overview:\n");
    out.push_str(&format!("  Seed URLs: {}\n", stats.seeds));
    out.push_str(&format!("  URLs discovered: {}\n", stats.discovered));
    out.push_str(&format!("  Downloaded: {}\n", stats.downloaded));
    out.push_str(&format!("  Failed: {}\n", stats.failed));
    out.push_str(&format!("  Retries: {}\n", stats.retries));
    out.push_str(&format!(
        "  Files written: {} ({} bytes)\n",
        stats.files_written, stats.bytes_written
    ));
    if stats.write_errors > 0 {
        out.push_str(&format!("  Write errors: {}\n", stats.write_errors));
    }
    if stats.path_collisions > 0 {
        out.push_str(&format!(
            "  Skipped (same file as another URL): {}\n",
            stats.path_collisions
        ));
    }
    out.push('\n');

    out.push_str(&format!(
        "Assets by State ({} / {} settled, {} in error):\n",
        stats.settled(),
        stats.discovered,
        stats.errored()
    ));
    for state in AssetState::all_states() {
        let count = stats.count(state);
        if count > 0 {
            out.push_str(&format!("  {}: {}\n", state, count));
        }
    }
    out.push('\n');

    if !stats.failed_urls.is_empty() {
        out.push_str(&format!("Failed URLs ({}):\n", stats.failed_urls.len()));
        for url in &stats.failed_urls {
            out.push_str(&format!("  - {}\n", url));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} URLs mirrored)\n",
        stats.success_rate(),
        stats.succeeded(),
        stats.discovered
    ));

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
