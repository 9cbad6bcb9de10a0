use crate::url::parse_http_url;
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Parses a newline-delimited seed page list
///
/// Everything from the first `#` on a line is dropped, which removes both
/// trailing comments and URL fragments, so `page.html#a` and `page.html#b`
/// collapse into one seed. Blank lines are skipped and duplicates are removed
/// keeping the first occurrence.
///
/// # Example
///
/// ```
/// use site_mirror::config::parse_seed_list;
///
/// let seeds = parse_seed_list(
///     "https://example.com/a.html#intro\n\
///      ## full-line comment\n\
///      https://example.com/a.html#summary\n\
///      https://example.com/b/  # trailing comment\n",
/// )
/// .unwrap();
///
/// assert_eq!(seeds.len(), 2);
/// assert_eq!(seeds[1].as_str(), "https://example.com/b/");
/// ```
pub fn parse_seed_list(content: &str) -> Result<Vec<Url>, ConfigError> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let entry = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        if entry.is_empty() {
            continue;
        }

        let url = parse_http_url(entry).map_err(|e| {
            ConfigError::InvalidUrl(format!("line {}: '{}': {}", index + 1, entry, e))
        })?;

        if seen.insert(url.as_str().to_string()) {
            seeds.push(url);
        }
    }

    Ok(seeds)
}

/// Reads and parses a seed page list file
pub fn load_seed_list(path: &Path) -> Result<Vec<Url>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_seed_list(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_collapse() {
        let seeds = parse_seed_list(
            "https://host/index.html\nhttps://host/index.html#part2\nhttps://host/index.html#part3\n",
        )
        .unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].as_str(), "https://host/index.html");
    }

    #[test]
    fn test_order_preserved() {
        let seeds = parse_seed_list("https://host/b\nhttps://host/a\nhttps://host/b\n").unwrap();
        let urls: Vec<&str> = seeds.iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://host/b", "https://host/a"]);
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let seeds = parse_seed_list("\n   \n# nothing here\nhttps://host/\r\n").unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].as_str(), "https://host/");
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let err = parse_seed_list("https://host/\nnot a url\n").unwrap_err();
        match err {
            ConfigError::InvalidUrl(message) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_seed_list(Path::new("/nonexistent/PAGES"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
