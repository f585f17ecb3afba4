use crate::UrlError;
use url::Url;

/// Parses, resolves and normalizes a URL into its frontier dedup form
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` when given (relative links), otherwise parse it as absolute
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Lowercase the host (the `url` crate also drops default ports)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment (everything after #)
///
/// The query string is kept verbatim, so `?page=1` and `?page=2` stay distinct pages.
///
/// # Examples
///
/// ```
/// use sift_crawler::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.COM/page/#top", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(normalize(&parsed))
}

/// Normalizes an already-parsed HTTP(S) URL
///
/// Two URLs that differ only by fragment, host case or trailing slash yield equal results.
pub fn normalize(url: &Url) -> Url {
    let mut url = url.clone();

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            // Only fails for hosts the parser would already have rejected
            let _ = url.set_host(Some(&lowered));
        }
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    url
}

/// Returns the string key used for frontier and result deduplication
pub fn dedup_key(url: &Url) -> String {
    normalize(url).into()
}

/// Normalizes a URL path by removing dot segments, empty segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}
