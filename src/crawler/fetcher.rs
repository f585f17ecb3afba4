//! Fetcher abstraction and the HTTP implementation
//!
//! The engine only sees the [`Fetcher`] trait. `HttpFetcher` is the static backend built on
//! reqwest; `ModeFetcher` routes dynamic (headless) requests to an optional second backend.
//! Retries are not performed here: a failed fetch is reported once and recorded by the worker.

use crate::config::UserAgentConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirect hops followed for a single fetch
pub const MAX_REDIRECTS: usize = 10;

/// Raw result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Response body
    pub body: Vec<u8>,

    /// URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value, if the response carried one
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Returns true if the response is HTML or carries no content type at all
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            None => true,
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml+xml")
            }
        }
    }

    /// Decodes the body as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Retrieves raw page bytes for a URL
///
/// Implementations must bound the call by `timeout` and report non-success statuses as
/// `FetchError::Status`. `dynamic` asks for a JavaScript-rendered page; backends that cannot
/// render treat it as a static fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration, dynamic: bool)
        -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sift_crawler::config::UserAgentConfig;
/// use sift_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SiftBot".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    build_client_with_agent(&config.header_value())
}

/// Builds an HTTP client sending `user_agent` verbatim
pub fn build_client_with_agent(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher sending `user_agent` verbatim
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_client_with_agent(user_agent)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        timeout: Duration,
        _dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, timeout))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            debug!("{} returned HTTP {}", url, status.as_u16());
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        Ok(FetchedPage {
            body: body.to_vec(),
            final_url,
            status_code: status.as_u16(),
            content_type,
        })
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_redirect() {
        FetchError::Network(format!("Redirect error: {}", error))
    } else if error.is_connect() {
        FetchError::Network(format!("Connection failed: {}", error))
    } else {
        FetchError::Network(error.to_string())
    }
}

/// Routes fetches to the static or the dynamic backend
///
/// Without a dynamic backend, dynamic requests fall back to the static one; the fallback is
/// logged once per `ModeFetcher`.
pub struct ModeFetcher {
    static_fetcher: Arc<dyn Fetcher>,
    dynamic_fetcher: Option<Arc<dyn Fetcher>>,
    warned: AtomicBool,
}

impl ModeFetcher {
    pub fn new(static_fetcher: Arc<dyn Fetcher>, dynamic_fetcher: Option<Arc<dyn Fetcher>>) -> Self {
        Self {
            static_fetcher,
            dynamic_fetcher,
            warned: AtomicBool::new(false),
        }
    }

    /// The static backend, used for robots.txt and image downloads
    pub fn static_fetcher(&self) -> Arc<dyn Fetcher> {
        Arc::clone(&self.static_fetcher)
    }
}

#[async_trait]
impl Fetcher for ModeFetcher {
    async fn fetch(
        &self,
        url: &Url,
        timeout: Duration,
        dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        match (&self.dynamic_fetcher, dynamic) {
            (Some(dynamic_fetcher), true) => dynamic_fetcher.fetch(url, timeout, true).await,
            (None, true) => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    warn!("No dynamic fetcher configured, falling back to static fetching");
                }
                self.static_fetcher.fetch(url, timeout, false).await
            }
            (_, false) => self.static_fetcher.fetch(url, timeout, false).await,
        }
    }
}
