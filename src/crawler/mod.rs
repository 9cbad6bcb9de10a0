//! Crawler module for downloading and mirroring a site
//!
//! This module contains the core mirroring logic, including:
//! - A FIFO semaphore bounding concurrent downloads
//! - Single-flight asset downloads with a per-attempt deadline
//! - Retry policy for failed downloads
//! - HTML link extraction, registered per file extension
//! - The registry that de-duplicates URLs and writes the mirror tree

mod asset;
mod fetcher;
mod handlers;
mod parser;
mod persist;
mod registry;
mod retry;
mod semaphore;

pub use asset::{
    Asset, AssetObserver, DownloadContext, DownloadHandle, DownloadResult, LoggingObserver,
};
pub use fetcher::{build_http_client, fetch_bytes, USER_AGENT};
pub use handlers::ExtensionHandlers;
pub use parser::{parse_tag_events, HtmlLinkExtractor, LinkExtractor, TagEvent, TagKind};
pub use persist::{ensure_dir, prepare_mirror_dir, write_asset};
pub use registry::Registry;
pub use retry::{RetryDecision, RetryPolicy, RetryStrategy, DEFAULT_MAX_ATTEMPTS};
pub use semaphore::{Permit, PermitId, Semaphore};

use crate::config::{load_seed_list, Config, CrawlerConfig};
use crate::output::CrawlStatistics;
use crate::url::DomainScope;
use crate::{ConfigResult, Result};
use std::sync::Arc;
use url::Url;

/// Builds the extractor table used for a crawl
///
/// HTML pages (`.html`, `.htm` and directory URLs) are parsed for
/// same-domain references; every other extension is stored without parsing.
pub fn default_handlers(crawler: &CrawlerConfig) -> ConfigResult<ExtensionHandlers> {
    let extractor = HtmlLinkExtractor::new(DomainScope::new(crawler.target_domain.as_str()))
        .follow_html_links(crawler.follow_html_links);

    let mut handlers = ExtensionHandlers::new();
    handlers.register("html", extractor.clone())?;
    handlers.register("htm", extractor)?;
    Ok(handlers)
}

/// Runs a complete mirror operation
///
/// Reads the seed list named by the configuration and mirrors it. See
/// [`mirror_seeds`].
pub async fn mirror_site(config: &Config) -> Result<CrawlStatistics> {
    let seeds = load_seed_list(&config.input.pages_file)?;
    mirror_seeds(config, seeds).await
}

/// Mirrors the given seed pages and everything they reference
///
/// This will:
/// 1. Prepare (and by default clean) the mirror directory
/// 2. Build the HTTP client, semaphore and registry
/// 3. Enqueue the seeds
/// 4. Wait until every discovered URL has settled
///
/// Individual download or write failures never abort the crawl; they are
/// reported in the returned statistics.
pub async fn mirror_seeds(
    config: &Config,
    seeds: Vec<Url>,
) -> Result<CrawlStatistics> {
    prepare_mirror_dir(&config.output.mirror_dir, config.output.clean_before_crawl).await?;

    let client = build_http_client()?;
    let semaphore = Arc::new(Semaphore::new(
        config.crawler.max_concurrent_downloads as usize,
    ));
    let context = Arc::new(DownloadContext::new(
        client,
        semaphore,
        config.crawler.download_timeout(),
    ));

    let registry = Registry::new(
        context,
        default_handlers(&config.crawler)?,
        config.output.mirror_dir.clone(),
        RetryPolicy::from_config(&config.retry),
    );

    let scope = DomainScope::new(config.crawler.target_domain.as_str());
    for seed in seeds.iter().filter(|seed| !scope.contains(seed)) {
        tracing::warn!(
            "Seed {} is outside {}; its links will not be followed",
            seed,
            scope.pattern()
        );
    }

    let added = registry.enqueue_seeds(seeds);
    tracing::info!(
        "Mirroring {} seed pages into {} ({} concurrent downloads, {:?} timeout)",
        added,
        config.output.mirror_dir.display(),
        config.crawler.max_concurrent_downloads,
        config.crawler.download_timeout()
    );

    registry.wait_idle().await;

    let stats = registry.statistics();
    tracing::info!(
        "Mirror completed: {} downloaded, {} failed, {} URLs discovered",
        stats.downloaded,
        stats.failed,
        stats.discovered
    );

    Ok(stats)
}
