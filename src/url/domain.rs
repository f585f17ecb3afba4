use url::Url;

/// Extracts the politeness key of a URL's host
///
/// The key is the lowercase host, with the port appended when it is not the scheme default,
/// so two servers on the same machine but different ports are scheduled independently.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sift_crawler::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Extracts the bare lowercase host name, without port
pub fn host_name(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
