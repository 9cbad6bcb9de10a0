use crate::{UrlError, UrlResult};
use url::Url;

/// Parses an absolute HTTP(S) URL and drops its fragment
///
/// Fragments never change what the server returns, so `page.html#intro` and
/// `page.html` are the same asset.
///
/// # Examples
///
/// ```
/// use site_mirror::url::parse_http_url;
///
/// let url = parse_http_url("https://example.com/docs/page.html#intro").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/page.html");
/// ```
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a `src`/`href` attribute value against the page it appeared on
///
/// Handles relative paths, root-relative paths, protocol-relative references
/// and absolute URLs. Returns None for references that cannot point at a
/// downloadable resource:
/// - empty values and fragment-only anchors
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - anything that resolves to a non-HTTP(S) scheme
pub fn resolve_reference(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lowered = reference.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut resolved = base.join(reference).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved)
}
