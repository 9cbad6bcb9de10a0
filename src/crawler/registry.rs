//! Crawl registry - de-duplication and orchestration of asset downloads
//!
//! The registry owns one [`Asset`] per distinct URL string. Enqueuing an unseen
//! URL claims it synchronously and spawns a task that downloads the asset,
//! retries it according to the [`RetryPolicy`], and on success runs two steps
//! concurrently:
//!
//! - write the body to its mirrored path below the mirror root
//! - run the link extractor registered for the URL's extension and enqueue
//!   every link it returns
//!
//! The crawl goal grows with every enqueued URL. [`Registry::wait_idle`]
//! resolves once every URL discovered so far has settled, which includes the
//! URLs found while the last pages were being processed.
//!
//! URLs that differ only in their query string share a mirrored path. The
//! first URL to be written owns the file; later ones are logged and skipped.
//! A processing task that panics counts as a failure of its URL and still
//! releases its slot in the in-flight count.

use crate::crawler::asset::{Asset, DownloadContext};
use crate::crawler::handlers::ExtensionHandlers;
use crate::crawler::persist::write_asset;
use crate::crawler::retry::{RetryDecision, RetryPolicy};
use crate::output::CrawlStatistics;
use crate::url::{extension_of, mirror_path};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use url::Url;

#[derive(Debug, Default)]
struct Counters {
    seeds: AtomicU64,
    downloaded: AtomicU64,
    retries: AtomicU64,
    files_written: AtomicU64,
    bytes_written: AtomicU64,
    write_errors: AtomicU64,
    path_collisions: AtomicU64,
}

#[derive(Default)]
struct Entries {
    assets: HashMap<String, Arc<Asset>>,
    // URLs whose processing ended in failure; only these can be resubmitted
    given_up: HashSet<String>,
    // Mirrored file path -> URL that owns it
    written_paths: HashMap<PathBuf, String>,
}

/// Map of every URL seen during one crawl
pub struct Registry {
    entries: Mutex<Entries>,
    context: Arc<DownloadContext>,
    handlers: ExtensionHandlers,
    mirror_dir: PathBuf,
    retry: RetryPolicy,
    counters: Counters,
    // Number of URLs whose processing task has not finished
    in_flight: watch::Sender<usize>,
    started_at: DateTime<Utc>,
}

impl Registry {
    /// Creates an empty registry writing below `mirror_dir`
    pub fn new(
        context: Arc<DownloadContext>,
        handlers: ExtensionHandlers,
        mirror_dir: impl Into<PathBuf>,
        retry: RetryPolicy,
    ) -> Arc<Self> {
        let (in_flight, _) = watch::channel(0);
        Arc::new(Self {
            entries: Mutex::new(Entries::default()),
            context,
            handlers,
            mirror_dir: mirror_dir.into(),
            retry,
            counters: Counters::default(),
            in_flight,
            started_at: Utc::now(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Number of distinct URLs seen
    pub fn len(&self) -> usize {
        self.lock().assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().assets.is_empty()
    }

    /// Returns the asset registered for an exact URL string
    pub fn asset(&self, url: &str) -> Option<Arc<Asset>> {
        self.lock().assets.get(url).cloned()
    }

    /// URLs that were given up on and not resubmitted since, sorted
    pub fn failed_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.lock().given_up.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Enqueues a URL for mirroring
    ///
    /// Returns false if the exact URL string was already seen. The claim is
    /// made before this function returns, so concurrent discoveries of the
    /// same URL never start a second download. Must be called from within a
    /// tokio runtime.
    pub fn enqueue(self: &Arc<Self>, url: Url) -> bool {
        let asset = {
            let mut entries = self.lock();
            if entries.assets.contains_key(url.as_str()) {
                tracing::trace!("Already registered: {}", url);
                return false;
            }

            let asset = Asset::new(url, Arc::clone(&self.context));
            entries
                .assets
                .insert(asset.url().to_string(), Arc::clone(&asset));
            asset
        };

        tracing::debug!("Enqueued {}", asset.url());
        self.spawn_processing(asset);
        true
    }

    /// Enqueues seed URLs and returns how many of them were new
    pub fn enqueue_seeds<I>(self: &Arc<Self>, seeds: I) -> usize
    where
        I: IntoIterator<Item = Url>,
    {
        let mut added = 0;
        for seed in seeds {
            self.counters.seeds.fetch_add(1, Ordering::Relaxed);
            if self.enqueue(seed) {
                added += 1;
            }
        }
        added
    }

    /// Resets a failed asset and processes it again
    ///
    /// Returns false unless the URL's processing has ended in failure; an
    /// asset waiting out a retry delay cannot be resubmitted. With a manual
    /// retry policy this is the only way a failed asset is downloaded again.
    pub fn resubmit(self: &Arc<Self>, url: &str) -> bool {
        let asset = {
            let mut entries = self.lock();
            if !entries.given_up.remove(url) {
                return false;
            }
            let Some(asset) = entries.assets.get(url).cloned() else {
                return false;
            };
            asset.reset();
            asset
        };

        tracing::info!("Resubmitting {}", url);
        self.spawn_processing(asset);
        true
    }

    /// Resolves once every enqueued URL has settled
    ///
    /// URLs enqueued while waiting extend the wait. Returns immediately if
    /// nothing is in flight.
    pub async fn wait_idle(&self) {
        let mut receiver = self.in_flight.subscribe();
        // The sender lives in self, so the channel cannot close while waiting
        let _ = receiver.wait_for(|count| *count == 0).await;
    }

    /// Number of URLs whose processing has not finished
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Snapshot of the crawl's progress
    ///
    /// `finished_at` is set when nothing is in flight.
    pub fn statistics(&self) -> CrawlStatistics {
        let mut stats = CrawlStatistics::new(self.started_at);

        {
            let entries = self.lock();
            stats.discovered = entries.assets.len() as u64;
            for asset in entries.assets.values() {
                *stats.assets_by_state.entry(asset.state()).or_insert(0) += 1;
            }
            stats.failed = entries.given_up.len() as u64;
            stats.failed_urls = entries.given_up.iter().cloned().collect();
        }
        stats.failed_urls.sort();

        stats.seeds = self.counters.seeds.load(Ordering::Relaxed);
        stats.downloaded = self.counters.downloaded.load(Ordering::Relaxed);
        stats.retries = self.counters.retries.load(Ordering::Relaxed);
        stats.files_written = self.counters.files_written.load(Ordering::Relaxed);
        stats.bytes_written = self.counters.bytes_written.load(Ordering::Relaxed);
        stats.write_errors = self.counters.write_errors.load(Ordering::Relaxed);
        stats.path_collisions = self.counters.path_collisions.load(Ordering::Relaxed);

        if self.in_flight() == 0 {
            stats.finished_at = Some(Utc::now());
        }

        stats
    }

    fn spawn_processing(self: &Arc<Self>, asset: Arc<Asset>) {
        self.in_flight.send_modify(|count| *count += 1);

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let url = asset.url().to_string();
            let task = tokio::spawn(Arc::clone(&registry).process(asset));
            if let Err(e) = task.await {
                tracing::error!("FAIL: {}: processing aborted: {}", url, e);
                registry.lock().given_up.insert(url);
            }
            // Discoveries were enqueued by the task, so the count cannot touch zero early
            registry.in_flight.send_modify(|count| *count -= 1);
        });
    }

    async fn process(self: Arc<Self>, asset: Arc<Asset>) {
        if let Some(body) = self.download_with_retry(&asset).await {
            self.counters.downloaded.fetch_add(1, Ordering::Relaxed);

            let (written, discovered) =
                tokio::join!(self.persist(&asset, &body), async {
                    self.discover(&asset, &body)
                });

            if written {
                tracing::info!("SUCCESS: {}", asset.url());
            }
            if discovered > 0 {
                tracing::debug!("{} new URLs from {}", discovered, asset.url());
            }
        } else {
            self.lock().given_up.insert(asset.url().to_string());
        }
    }

    async fn download_with_retry(&self, asset: &Arc<Asset>) -> Option<Bytes> {
        let mut attempt = 1;
        let mut force = false;

        loop {
            let error = match asset.download(force).await {
                Ok(body) => return Some(body),
                Err(error) => error,
            };

            match self.retry.should_retry(&error, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::info!("Retrying {} in {:?} (attempt {})", asset.url(), delay, next);
                    tokio::time::sleep(delay).await;
                    attempt = next;
                    force = true;
                }
                RetryDecision::DoNotRetry { reason } => {
                    tracing::error!("Giving up on {}: {}", asset.url(), reason);
                    return None;
                }
            }
        }
    }

    /// Claims the asset's mirrored path for its URL
    ///
    /// Returns false if a different URL already owns the path.
    fn claim_path(&self, url: &Url) -> bool {
        let path = mirror_path(&self.mirror_dir, url);
        let mut entries = self.lock();
        let owner = entries
            .written_paths
            .entry(path)
            .or_insert_with(|| url.to_string());
        if owner.as_str() == url.as_str() {
            return true;
        }

        tracing::warn!(
            "Skipping {}: its mirrored file is already written for {}",
            url,
            owner
        );
        false
    }

    async fn persist(&self, asset: &Asset, body: &Bytes) -> bool {
        if !self.claim_path(asset.url()) {
            self.counters.path_collisions.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match write_asset(&self.mirror_dir, asset.url(), body).await {
            Ok(path) => {
                self.counters.files_written.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .bytes_written
                    .fetch_add(body.len() as u64, Ordering::Relaxed);
                tracing::trace!("Wrote {}", path.display());
                true
            }
            Err(e) => {
                self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("FAIL: {}: {}", asset.url(), e);
                false
            }
        }
    }

    fn discover(self: &Arc<Self>, asset: &Asset, body: &Bytes) -> usize {
        let Some(extension) = extension_of(asset.url()) else {
            return 0;
        };
        let Some(extractor) = self.handlers.get(&extension) else {
            return 0;
        };

        extractor
            .extract(asset.url(), body)
            .into_iter()
            .map(|link| self.enqueue(link))
            .filter(|added| *added)
            .count()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("mirror_dir", &self.mirror_dir)
            .field("assets", &self.len())
            .field("in_flight", &self.in_flight())
            .field("handlers", &self.handlers)
            .finish()
    }
}
