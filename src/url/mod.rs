//! URL handling module for Site-Mirror
//!
//! This module provides reference resolution, domain scoping, and the mapping
//! from URLs to files inside the mirror directory.

mod matcher;
mod mirror;
mod resolve;

pub use matcher::matches_wildcard;
pub use mirror::{extension_of, is_html_page, mirror_path, INDEX_FILE};
pub use resolve::{parse_http_url, resolve_reference};

use url::Url;

/// Extracts the lowercase host from a URL
///
/// Returns None for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// The set of hosts a crawl is allowed to download from
///
/// Built from a single domain pattern ("www.example.com" or "*.example.com").
/// Ports are not part of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainScope {
    pattern: String,
}

impl DomainScope {
    /// Creates a scope from a domain pattern
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into().to_lowercase(),
        }
    }

    /// Creates a scope covering exactly the host of `url`
    pub fn for_url(url: &Url) -> Option<Self> {
        extract_domain(url).map(Self::new)
    }

    /// Returns the configured pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if the URL's host is inside this scope
    pub fn contains(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => matches_wildcard(&self.pattern, &host),
            None => false,
        }
    }
}
