/// Checks if a host matches a domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any
///    subdomain such as "cdn.example.com" or "a.b.example.com"
///
/// Comparison ignores ASCII case and a single trailing root dot on the host.
///
/// # Examples
///
/// ```
/// use site_mirror::url::matches_wildcard;
///
/// assert!(matches_wildcard("www.gamemath.com", "www.gamemath.com"));
/// assert!(!matches_wildcard("www.gamemath.com", "gamemath.com"));
///
/// assert!(matches_wildcard("*.gamemath.com", "gamemath.com"));
/// assert!(matches_wildcard("*.gamemath.com", "cdn.gamemath.com"));
/// assert!(!matches_wildcard("*.gamemath.com", "notgamemath.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let candidate = candidate.strip_suffix('.').unwrap_or(candidate);

    match pattern.strip_prefix("*.") {
        Some(base) => {
            if candidate.eq_ignore_ascii_case(base) {
                return true;
            }
            // A subdomain needs at least one label plus the separating dot
            candidate.len() > base.len() + 1
                && candidate.as_bytes()[candidate.len() - base.len() - 1] == b'.'
                && candidate[candidate.len() - base.len()..].eq_ignore_ascii_case(base)
        }
        None => candidate.eq_ignore_ascii_case(pattern),
    }
}
