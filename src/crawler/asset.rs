//! A single downloadable resource
//!
//! An [`Asset`] owns at most one in-flight download. Callers that ask for the
//! same asset while a download is running share that download's outcome
//! instead of starting another request. Each attempt holds a semaphore permit
//! for the duration of the request and is cut off after a fixed deadline.

use crate::crawler::fetcher::fetch_bytes;
use crate::crawler::semaphore::Semaphore;
use crate::state::AssetState;
use crate::DownloadError;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

/// Outcome of one download attempt
pub type DownloadResult = Result<Bytes, DownloadError>;

/// Cloneable handle to a download; every clone resolves to the same outcome
pub type DownloadHandle = Shared<BoxFuture<'static, DownloadResult>>;

/// Receives asset completion notifications
///
/// Called after the semaphore permit has been released. Notifications from a
/// superseded attempt (one replaced by a forced download or a reset) are not
/// delivered.
pub trait AssetObserver: Send + Sync {
    fn on_downloaded(&self, _asset: &Asset, _bytes: &Bytes) {}

    fn on_failed(&self, _asset: &Asset, _error: &DownloadError) {}
}

/// Observer that logs one line per finished download
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl AssetObserver for LoggingObserver {
    fn on_downloaded(&self, asset: &Asset, bytes: &Bytes) {
        tracing::debug!("DOWNLOADED: {} ({} bytes)", asset.url(), bytes.len());
    }

    fn on_failed(&self, asset: &Asset, error: &DownloadError) {
        tracing::warn!("FAIL: {}: {}", asset.url(), error);
    }
}

/// Collaborators shared by every asset of one crawl
pub struct DownloadContext {
    client: Client,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    observer: Arc<dyn AssetObserver>,
}

impl DownloadContext {
    /// Creates a context that logs completions
    pub fn new(client: Client, semaphore: Arc<Semaphore>, timeout: Duration) -> Self {
        Self {
            client,
            semaphore,
            timeout,
            observer: Arc::new(LoggingObserver),
        }
    }

    /// Replaces the completion observer
    pub fn with_observer(mut self, observer: Arc<dyn AssetObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The semaphore bounding concurrent downloads
    pub fn semaphore(&self) -> &Arc<Semaphore> {
        &self.semaphore
    }

    /// The per-download deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Debug for DownloadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadContext")
            .field("semaphore", &self.semaphore)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

struct AssetInner {
    state: AssetState,
    handle: Option<DownloadHandle>,
    bytes: Option<Bytes>,
    attempts: u32,
    // Bumped by every new attempt and every reset; completions carrying an
    // older value are stale
    generation: u64,
}

/// One remote resource, identified by its URL
pub struct Asset {
    url: Url,
    context: Arc<DownloadContext>,
    inner: Mutex<AssetInner>,
}

impl Asset {
    /// Creates a pending asset
    pub fn new(url: Url, context: Arc<DownloadContext>) -> Arc<Self> {
        Arc::new(Self {
            url,
            context,
            inner: Mutex::new(AssetInner {
                state: AssetState::Pending,
                handle: None,
                bytes: None,
                attempts: 0,
                generation: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, AssetInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> AssetState {
        self.lock().state
    }

    /// Body of the last successful download
    pub fn bytes(&self) -> Option<Bytes> {
        self.lock().bytes.clone()
    }

    /// Number of download attempts started so far
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    /// Starts a download, or joins the existing one
    ///
    /// Without `force`, an existing handle is returned as is: a running
    /// download is shared and a finished one yields its cached outcome. With
    /// `force`, a new attempt always starts and supersedes any previous one.
    ///
    /// The attempt is driven by a spawned task, so it completes (and releases
    /// its permit) even if nobody awaits the handle. Must be called from
    /// within a tokio runtime.
    pub fn download(self: &Arc<Self>, force: bool) -> DownloadHandle {
        let mut inner = self.lock();
        if !force {
            if let Some(handle) = &inner.handle {
                return handle.clone();
            }
        }

        inner.generation += 1;
        inner.attempts += 1;
        inner.state = AssetState::Downloading;

        let handle = Arc::clone(self).attempt(inner.generation).boxed().shared();
        inner.handle = Some(handle.clone());
        drop(inner);

        tokio::spawn(handle.clone());
        handle
    }

    /// Forgets the current download and returns the asset to `Pending`
    ///
    /// A download still running keeps its permit until it finishes, but its
    /// outcome no longer changes this asset.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.handle = None;
        inner.state = AssetState::Pending;
    }

    async fn attempt(self: Arc<Self>, generation: u64) -> DownloadResult {
        let permit = self.context.semaphore.acquire().await;

        let timeout = self.context.timeout;
        // Dropping the request future on expiry aborts the connection
        let outcome = match tokio::time::timeout(
            timeout,
            fetch_bytes(&self.context.client, self.url.as_str()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DownloadError::Timeout {
                url: self.url.to_string(),
                timeout,
            }),
        };

        permit.release();
        drop(permit);

        let current = {
            let mut inner = self.lock();
            if inner.generation == generation {
                match &outcome {
                    Ok(bytes) => {
                        inner.state = AssetState::Downloaded;
                        inner.bytes = Some(bytes.clone());
                    }
                    Err(_) => inner.state = AssetState::Failed,
                }
                true
            } else {
                false
            }
        };

        if current {
            match &outcome {
                Ok(bytes) => self.context.observer.on_downloaded(&self, bytes),
                Err(error) => self.context.observer.on_failed(&self, error),
            }
        } else {
            tracing::debug!("Discarding superseded download of {}", self.url);
        }

        outcome
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Asset")
            .field("url", &self.url.as_str())
            .field("state", &inner.state)
            .field("attempts", &inner.attempts)
            .finish()
    }
}
