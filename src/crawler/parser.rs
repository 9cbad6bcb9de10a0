//! HTML link extraction
//!
//! Downloaded HTML is turned into a list of [`TagEvent`]s, one per opening
//! `script`, `img`, `link` or `a` tag, and each event's reference is resolved
//! against the page URL. Only references that land inside the crawl's
//! [`DomainScope`] are returned.

use crate::url::{is_html_page, resolve_reference, DomainScope};
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Tags that can reference another mirrored asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Script,
    Img,
    Link,
    Anchor,
}

impl TagKind {
    /// Maps a lowercase tag name to its kind
    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "script" => Some(Self::Script),
            "img" => Some(Self::Img),
            "link" => Some(Self::Link),
            "a" => Some(Self::Anchor),
            _ => None,
        }
    }

    /// The attribute holding the referenced URL
    pub fn reference_attribute(&self) -> &'static str {
        match self {
            Self::Script | Self::Img => "src",
            Self::Link | Self::Anchor => "href",
        }
    }

    /// Whether the reference points at another page rather than a sub-resource
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Link | Self::Anchor)
    }
}

/// One opening tag of interest and its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEvent {
    pub kind: TagKind,
    pub attributes: HashMap<String, String>,
}

impl TagEvent {
    /// The raw `src`/`href` value, if present
    pub fn reference(&self) -> Option<&str> {
        self.attributes
            .get(self.kind.reference_attribute())
            .map(String::as_str)
    }
}

/// Parses HTML and returns the tag events in document order
pub fn parse_tag_events(html: &str) -> Vec<TagEvent> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("script, img, link, a") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let kind = TagKind::from_tag_name(element.value().name())?;
            let attributes = element
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            Some(TagEvent { kind, attributes })
        })
        .collect()
}

/// Turns a downloaded resource into further URLs to mirror
///
/// Implemented for plain closures so ad-hoc handlers can be registered
/// without a dedicated type.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, base_url: &Url, body: &[u8]) -> Vec<Url>;
}

impl<F> LinkExtractor for F
where
    F: Fn(&Url, &[u8]) -> Vec<Url> + Send + Sync,
{
    fn extract(&self, base_url: &Url, body: &[u8]) -> Vec<Url> {
        self(base_url, body)
    }
}

/// Extracts same-domain `script`/`img`/`link`/`a` references from HTML
///
/// # Example
///
/// ```
/// use site_mirror::crawler::{HtmlLinkExtractor, LinkExtractor};
/// use site_mirror::url::DomainScope;
/// use url::Url;
///
/// let extractor = HtmlLinkExtractor::new(DomainScope::new("host"));
/// let base = Url::parse("https://host/dir/page.html").unwrap();
/// let html = br#"<link rel="stylesheet" href="../x.css"><a href="https://otherhost/y">y</a>"#;
///
/// let links = extractor.extract(&base, html);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://host/x.css");
/// ```
#[derive(Debug, Clone)]
pub struct HtmlLinkExtractor {
    scope: DomainScope,
    follow_html_links: bool,
}

impl HtmlLinkExtractor {
    /// Creates an extractor that skips `link`/`a` references to `.html` pages
    pub fn new(scope: DomainScope) -> Self {
        Self {
            scope,
            follow_html_links: false,
        }
    }

    /// Sets whether `link`/`a` references to `.html` pages are followed
    pub fn follow_html_links(mut self, follow: bool) -> Self {
        self.follow_html_links = follow;
        self
    }

    /// Resolves one tag event, applying scope and page-link rules
    pub fn resolve_event(&self, base_url: &Url, event: &TagEvent) -> Option<Url> {
        let resolved = resolve_reference(base_url, event.reference()?)?;

        if !self.scope.contains(&resolved) {
            return None;
        }

        if event.kind.is_navigation() && !self.follow_html_links && is_html_page(&resolved) {
            return None;
        }

        Some(resolved)
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract(&self, base_url: &Url, body: &[u8]) -> Vec<Url> {
        let html = String::from_utf8_lossy(body);
        parse_tag_events(&html)
            .iter()
            .filter_map(|event| self.resolve_event(base_url, event))
            .collect()
    }
}
