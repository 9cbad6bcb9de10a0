use std::path::{Path, PathBuf};
use url::Url;

/// File name used for URLs whose path names a directory
pub const INDEX_FILE: &str = "index.html";

/// Maps a URL onto a file path inside the mirror directory
///
/// Path segments after the host become directory segments. A path ending in
/// `/` names a directory and maps to its `index.html`. Query strings are not
/// part of the file name.
///
/// # Examples
///
/// ```
/// use site_mirror::url::mirror_path;
/// use std::path::Path;
/// use url::Url;
///
/// let root = Path::new("/mirror");
/// let url = Url::parse("https://host/a/b").unwrap();
/// assert_eq!(mirror_path(root, &url), Path::new("/mirror/a/b"));
///
/// let url = Url::parse("https://host/a/").unwrap();
/// assert_eq!(mirror_path(root, &url), Path::new("/mirror/a/index.html"));
///
/// let url = Url::parse("https://host/").unwrap();
/// assert_eq!(mirror_path(root, &url), Path::new("/mirror/index.html"));
/// ```
pub fn mirror_path(root: &Path, url: &Url) -> PathBuf {
    let mut path = root.to_path_buf();

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    for segment in &segments {
        // Empty segments come from "//" or the trailing slash; dot segments
        // must never climb out of the mirror root
        if segment.is_empty() || *segment == "." || *segment == ".." {
            continue;
        }
        path.push(segment);
    }

    if url.path().ends_with('/') || path == root {
        path.push(INDEX_FILE);
    }

    path
}

/// Returns the lowercase extension of the resource a URL names, without the dot
///
/// Directory URLs (path ending in `/`) are served as HTML, so they report
/// `html`. Files without an extension, or dot-files such as `.htaccess`,
/// report None.
///
/// # Examples
///
/// ```
/// use site_mirror::url::extension_of;
/// use url::Url;
///
/// let url = Url::parse("https://host/js/app.JS?v=3").unwrap();
/// assert_eq!(extension_of(&url).as_deref(), Some("js"));
///
/// let url = Url::parse("https://host/docs/").unwrap();
/// assert_eq!(extension_of(&url).as_deref(), Some("html"));
/// ```
pub fn extension_of(url: &Url) -> Option<String> {
    let path = url.path();
    if path.ends_with('/') {
        return Some("html".to_string());
    }

    let file_name = path.rsplit('/').next()?;
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Returns true if the URL names a whole HTML page by file name
pub fn is_html_page(url: &Url) -> bool {
    matches!(extension_of(url).as_deref(), Some("html" | "htm")) && !url.path().ends_with('/')
}
