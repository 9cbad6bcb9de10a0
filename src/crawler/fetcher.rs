//! HTTP fetcher implementation
//!
//! This module handles the network side of a download:
//! - Building the shared HTTP client
//! - Issuing a GET request and reading the full body
//! - Classifying failures into [`DownloadError`]
//!
//! Deadlines are applied by the caller (see `Asset`), so the client itself
//! carries only a connect timeout.

use crate::DownloadError;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by all downloads of a crawl
///
/// # Example
///
/// ```
/// use site_mirror::crawler::build_http_client;
///
/// let client = build_http_client().unwrap();
/// ```
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body
///
/// Any non-2xx status is a failure; the body of error pages is never
/// mirrored.
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | `Ok(body)` |
/// | other status | `DownloadError::Http` |
/// | connect/DNS/TLS/body error | `DownloadError::Network` |
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Bytes, DownloadError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| network_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.bytes().await.map_err(|e| network_error(url, &e))
}

fn network_error(url: &str, error: &reqwest::Error) -> DownloadError {
    let message = if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("failed to read body: {}", error)
    } else {
        error.to_string()
    };

    DownloadError::Network {
        url: url.to_string(),
        message,
    }
}
