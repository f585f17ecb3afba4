/// Checks if a host matches a domain pattern
///
/// Two pattern forms are supported:
/// 1. Exact: `example.com` matches only `example.com`
/// 2. Wildcard: `*.example.com` matches `example.com` and every subdomain of it
///
/// Comparison is ASCII case-insensitive and ignores any `:port` suffix on the host.
///
/// # Examples
///
/// ```
/// use sift_crawler::url::matches_pattern;
///
/// assert!(matches_pattern("example.com", "EXAMPLE.com"));
/// assert!(matches_pattern("*.example.com", "blog.example.com:8080"));
/// assert!(!matches_pattern("*.example.com", "myexample.com"));
/// ```
pub fn matches_pattern(pattern: &str, host: &str) -> bool {
    let host = strip_port(host).to_ascii_lowercase();
    let pattern = pattern.trim().to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => {
            host == base
                || (host.len() > base.len()
                    && host.ends_with(base)
                    && host.as_bytes()[host.len() - base.len() - 1] == b'.')
        }
        None => host == pattern,
    }
}

/// Removes a trailing `:port` from a host key, leaving IPv6 literals intact
fn strip_port(host: &str) -> &str {
    if host.ends_with(']') {
        return host;
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) && !name.contains(':') => {
            name
        }
        _ => host,
    }
}
