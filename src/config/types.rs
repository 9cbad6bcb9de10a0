use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Mirror
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub output: OutputConfig,
    pub input: InputConfig,
}

/// Download behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Host pattern assets must belong to ("www.example.com" or "*.example.com")
    #[serde(rename = "target-domain")]
    pub target_domain: String,

    /// Maximum number of downloads in flight at once
    #[serde(rename = "max-concurrent-downloads", default = "default_max_concurrent")]
    pub max_concurrent_downloads: u32,

    /// Deadline for a single download (milliseconds)
    #[serde(rename = "download-timeout-ms", default = "default_timeout_ms")]
    pub download_timeout_ms: u64,

    /// Whether `<a>`/`<link>` references to `.html` pages are followed
    #[serde(rename = "follow-html-links", default)]
    pub follow_html_links: bool,
}

impl CrawlerConfig {
    /// Returns the per-download deadline
    pub fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }
}

/// Which retry strategy to apply to failed downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// Retry up to `max-attempts` total attempts
    Bounded,
    /// Retry transient failures until they succeed
    Unbounded,
    /// Never retry automatically; failed assets wait for an explicit resubmit
    Manual,
}

/// Retry configuration for failed downloads
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_mode")]
    pub strategy: RetryMode,

    /// Maximum attempts including the first one (bounded strategy only)
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single retry delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor applied to the delay after each failed attempt
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_mode(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root of the mirrored directory tree
    #[serde(rename = "mirror-dir")]
    pub mirror_dir: PathBuf,

    /// Delete existing mirror contents before crawling
    #[serde(rename = "clean-before-crawl", default = "default_true")]
    pub clean_before_crawl: bool,
}

/// Input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Newline-delimited list of seed page URLs
    #[serde(rename = "pages-file")]
    pub pages_file: PathBuf,
}

fn default_max_concurrent() -> u32 {
    8
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_mode() -> RetryMode {
    RetryMode::Bounded
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}
