//! Integration tests for the crawl engine
//!
//! These tests run full jobs through `CrawlEngine`, either against wiremock servers
//! through the real HTTP fetcher or against scripted in-memory sites.

use async_trait::async_trait;
use sift_crawler::config::ScoringSettings;
use sift_crawler::crawler::{FetchedPage, Fetcher, HttpFetcher, ImageStore};
use sift_crawler::state::FailureReason;
use sift_crawler::{
    ConfigError, CrawlEngine, CrawlJob, FetchError, JobHandle, JobState, PageResult, PageStatus,
    RelevanceBasis, RelevanceScorer, ScoreRequest, ScorerError, ScoringTask, SiftError,
    TerminalReason,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(title: &str, body: &str) -> String {
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    )
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn page(url: &Url, body: &str) -> FetchedPage {
    FetchedPage {
        body: body.as_bytes().to_vec(),
        final_url: url.clone(),
        status_code: 200,
        content_type: Some("text/html".to_string()),
    }
}

/// A test job: no politeness delay and a short fetch timeout
fn test_job(seed: &str) -> CrawlJob {
    CrawlJob {
        delay: Duration::ZERO,
        fetch_timeout: Duration::from_secs(5),
        timeout: Duration::from_secs(30),
        ..CrawlJob::new(seed)
    }
}

fn http_engine() -> CrawlEngine {
    let fetcher = HttpFetcher::with_user_agent("sift-crawler/test").unwrap();
    CrawlEngine::new(Arc::new(fetcher))
}

/// Serves a fixed set of pages keyed by absolute URL; everything else is a 404
struct SiteFetcher {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl SiteFetcher {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
            redirects: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serves `to` whenever `from` is requested, as a followed redirect would
    fn with_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _timeout: Duration,
        _dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let final_url = match self.redirects.get(url.as_str()) {
            Some(target) => Url::parse(target).unwrap(),
            None => url.clone(),
        };
        match self.pages.get(final_url.as_str()) {
            Some(body) => Ok(page(&final_url, body)),
            None => Err(FetchError::Status { status: 404 }),
        }
    }
}

/// Serves a site but panics while fetching one of its URLs
struct PanickingFetcher {
    site: SiteFetcher,
    panic_on: String,
}

#[async_trait]
impl Fetcher for PanickingFetcher {
    async fn fetch(
        &self,
        url: &Url,
        timeout: Duration,
        dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        if url.as_str() == self.panic_on {
            panic!("fetcher blew up on {}", url);
        }
        self.site.fetch(url, timeout, dynamic).await
    }
}

/// A single slow page with one image; the image itself is served instantly
struct SlowImagePageFetcher {
    latency: Duration,
    requests: Mutex<Vec<String>>,
}

#[async_trait]
impl Fetcher for SlowImagePageFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _timeout: Duration,
        _dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match url.path() {
            "/" => {
                tokio::time::sleep(self.latency).await;
                Ok(page(url, &html("Gallery", r#"<img src="/pic.png" alt="pic">"#)))
            }
            "/pic.png" => Ok(FetchedPage {
                body: vec![0x89, b'P', b'N', b'G'],
                final_url: url.clone(),
                status_code: 200,
                content_type: Some("image/png".to_string()),
            }),
            _ => Err(FetchError::Status { status: 404 }),
        }
    }
}

/// Image store that only remembers what it was asked to store
#[derive(Default)]
struct RecordingStore {
    stored: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for RecordingStore {
    async fn store(&self, url: &Url, _bytes: &[u8]) -> std::io::Result<String> {
        self.stored.lock().unwrap().push(url.to_string());
        Ok(format!("/images/{}", url.path().trim_start_matches('/')))
    }
}

/// An endless site: every path `/a/b` links to `/a/b/0` .. `/a/b/{fanout-1}`, back to the
/// root, and to its first child again with a fragment
struct TreeFetcher {
    fanout: usize,
    latency: Duration,
    requests: Mutex<Vec<String>>,
}

impl TreeFetcher {
    fn new(fanout: usize, latency: Duration) -> Self {
        Self {
            fanout,
            latency,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn page_requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !u.ends_with("/robots.txt"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Fetcher for TreeFetcher {
    async fn fetch(
        &self,
        url: &Url,
        _timeout: Duration,
        _dynamic: bool,
    ) -> Result<FetchedPage, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        if url.path() == "/robots.txt" {
            return Err(FetchError::Status { status: 404 });
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let base = url.path().trim_end_matches('/');
        let mut links = String::from(r#"<a href="/">home</a>"#);
        for i in 0..self.fanout {
            links.push_str(&format!(r#"<a href="{}/{}">child {}</a>"#, base, i, i));
        }
        links.push_str(&format!(r#"<a href="{}/0#top">again</a>"#, base));

        Ok(page(url, &html(url.path(), &links)))
    }
}

/// Scorer that never answers within any reasonable timeout
struct StalledScorer;

#[async_trait]
impl RelevanceScorer for StalledScorer {
    async fn score(
        &self,
        _request: &ScoreRequest,
        _task: &ScoringTask,
    ) -> Result<f64, ScorerError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(1.0)
    }
}

/// Checks the structural guarantees every job's results must have
fn assert_well_formed(results: &[PageResult], max_depth: u32) {
    let mut urls = HashSet::new();
    for result in results {
        assert!(urls.insert(result.url.clone()), "{} appears twice", result.url);
        assert!(result.depth <= max_depth, "{} is too deep", result.url);
    }

    let by_url: HashMap<&str, &PageResult> =
        results.iter().map(|r| (r.url.as_str(), r)).collect();
    for result in results.iter().filter(|r| r.depth > 0) {
        let mut current: &PageResult = result;
        while current.depth > 0 {
            let parent = current.parent.as_deref().expect("non-seed page without parent");
            let next = by_url
                .get(parent)
                .unwrap_or_else(|| panic!("parent {} of {} not in results", parent, current.url));
            assert_eq!(next.depth + 1, current.depth);
            current = *next;
        }
        assert!(current.parent.is_none());
    }
}

fn urls(results: &[PageResult]) -> HashSet<String> {
    results.iter().map(|r| r.url.clone()).collect()
}

#[tokio::test]
async fn test_invalid_jobs_are_rejected() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(1, Duration::ZERO)));

    let negative_depth = CrawlJob {
        max_depth: -1,
        ..test_job("http://tree.test/")
    };
    assert!(matches!(
        engine.start_crawl(negative_depth),
        Err(ConfigError::Validation(_))
    ));

    let zero_pages = CrawlJob {
        max_pages: 0,
        ..test_job("http://tree.test/")
    };
    assert!(matches!(
        engine.start_crawl(zero_pages),
        Err(ConfigError::Validation(_))
    ));

    assert!(matches!(
        engine.start_crawl(test_job("not a url")),
        Err(ConfigError::InvalidUrl(_))
    ));

    let unknown_scorer = CrawlJob {
        scoring: Some(ScoringSettings::new("clip", "robots")),
        ..test_job("http://tree.test/")
    };
    assert!(matches!(
        engine.start_crawl(unknown_scorer),
        Err(ConfigError::UnknownScorer(name)) if name == "clip"
    ));

    let images_without_store = CrawlJob {
        download_images: true,
        ..test_job("http://tree.test/")
    };
    assert!(engine.start_crawl(images_without_store).is_err());

    assert!(engine.jobs_started().is_empty());
}

#[tokio::test]
async fn test_full_crawl_against_http_server() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html(
            "Home",
            &format!(
                r#"<a href="{}/page1">Page 1</a> <a href="/page2">Page 2</a> <a href="page1#intro">Again</a>"#,
                base
            ),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_response(html("Page 1", "Content 1")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_response(html(
            "Page 2",
            r#"Content 2 <a href="/missing">gone</a>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let engine = http_engine();
    let handle = engine.start_crawl(test_job(&format!("{}/", base))).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_well_formed(&results, 2);
    assert_eq!(results.len(), 4);
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.final_state(), JobState::Completed);
    assert_eq!(summary.terminal_reason, TerminalReason::FrontierEmpty);

    let home = results.iter().find(|r| r.depth == 0).unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.basis, Some(RelevanceBasis::Unfiltered));

    let missing = results.iter().find(|r| r.url.ends_with("/missing")).unwrap();
    assert_eq!(missing.status, PageStatus::Failed);
    assert_eq!(missing.depth, 2);
    assert_eq!(missing.error.as_deref(), Some("HTTP status 404"));
}

#[tokio::test]
async fn test_three_internal_links_and_one_external() {
    let site = [
        (
            "http://site.test/",
            html(
                "Root",
                r#"<a href="/a">a</a> <a href="/b">b</a> <a href="/c">c</a>
                   <a href="http://other.test/">elsewhere</a>"#,
            ),
        ),
        ("http://site.test/a", html("A", r#"<a href="/a/deeper">deeper</a>"#)),
        ("http://site.test/b", html("B", "b")),
        ("http://site.test/c", html("C", "c")),
        ("http://other.test/", html("Other", "other")),
    ];

    // Restricted to the seed's domain: root plus the three internal pages
    let engine = CrawlEngine::new(Arc::new(SiteFetcher::new(&site)));
    let job = CrawlJob {
        max_depth: 1,
        max_pages: 10,
        allow_domains: vec!["site.test".to_string()],
        ..test_job("http://site.test/")
    };
    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_well_formed(&results, 1);
    assert_eq!(results.len(), 4);
    assert_eq!(results.iter().filter(|r| r.depth == 0).count(), 1);
    assert_eq!(results.iter().filter(|r| r.depth == 1).count(), 3);
    assert_eq!(summary.terminal_reason, TerminalReason::DepthExhausted);

    // Unrestricted: the reachable external page is included at depth 1
    let engine = CrawlEngine::new(Arc::new(SiteFetcher::new(&site)));
    let job = CrawlJob {
        max_depth: 1,
        max_pages: 10,
        ..test_job("http://site.test/")
    };
    let handle = engine.start_crawl(job).unwrap();
    engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_well_formed(&results, 1);
    assert_eq!(results.len(), 5);
    let external = results
        .iter()
        .find(|r| r.url == "http://other.test/")
        .unwrap();
    assert_eq!(external.depth, 1);
    assert_eq!(external.parent.as_deref(), Some("http://site.test/"));
}

#[tokio::test]
async fn test_budget_depth_and_dedup_on_large_site() {
    let fetcher = Arc::new(TreeFetcher::new(3, Duration::ZERO));
    let engine = CrawlEngine::new(fetcher.clone());
    let job = CrawlJob {
        max_depth: 3,
        max_pages: 20,
        workers: 8,
        ..test_job("http://tree.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_well_formed(&results, 3);
    assert_eq!(results.len(), 20);
    assert_eq!(summary.terminal_reason, TerminalReason::BudgetExhausted);
    assert_eq!(summary.final_state(), JobState::Completed);

    let requests = fetcher.page_requests();
    let unique: HashSet<_> = requests.iter().collect();
    assert_eq!(requests.len(), unique.len(), "a page was fetched twice");
    assert_eq!(requests.len(), 20);
}

#[tokio::test]
async fn test_depth_limit_bounds_the_crawl() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(2, Duration::ZERO)));
    let job = CrawlJob {
        max_depth: 2,
        max_pages: 100,
        ..test_job("http://tree.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_well_formed(&results, 2);
    // 1 + 2 + 4
    assert_eq!(results.len(), 7);
    assert_eq!(summary.terminal_reason, TerminalReason::DepthExhausted);
}

#[tokio::test]
async fn test_keyword_match_is_case_insensitive() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html(
            "Lab news",
            r#"<p>Advances in Robotics this week.</p> <a href="/recipes">recipes</a>"#,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/recipes"))
        .respond_with(html_response(html(
            "Recipes",
            r#"<p>Slow-cooked beans.</p> <a href="/unreachable">more</a>"#,
        )))
        .mount(&server)
        .await;

    // Links of a filtered-out page are not followed
    Mock::given(method("GET"))
        .and(path("/unreachable"))
        .respond_with(html_response(html("More", "robot")))
        .expect(0)
        .mount(&server)
        .await;

    let engine = http_engine();
    let job = CrawlJob {
        keywords: vec!["robot".to_string()],
        ..test_job(&format!("{}/", server.uri()))
    };
    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 2);
    let home = results.iter().find(|r| r.depth == 0).unwrap();
    assert_eq!(home.status, PageStatus::Fetched);
    assert_eq!(
        home.basis,
        Some(RelevanceBasis::KeywordMatch {
            keyword: "robot".to_string()
        })
    );

    let recipes = results.iter().find(|r| r.depth == 1).unwrap();
    assert_eq!(recipes.status, PageStatus::FilteredOut);
    assert_eq!(recipes.basis, Some(RelevanceBasis::NoKeywordMatch));

    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.pages_filtered, 1);
}

#[tokio::test]
async fn test_scorer_timeout_fails_open() {
    let site = [("http://site.test/", html("Robots", "All about robots"))];
    let engine = CrawlEngine::new(Arc::new(SiteFetcher::new(&site)))
        .with_scorer("stalled", Arc::new(StalledScorer));

    let job = CrawlJob {
        scoring: Some(ScoringSettings {
            timeout: Duration::from_millis(50),
            ..ScoringSettings::new("stalled", "pages about robots")
        }),
        ..test_job("http://site.test/")
    };
    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.status, PageStatus::Fetched);
    assert!(result.score.is_none());
    assert!(result.basis.as_ref().unwrap().is_fail_open());
    assert_ne!(
        result.basis,
        Some(RelevanceBasis::KeywordMatch {
            keyword: "robots".to_string()
        })
    );
    assert_eq!(summary.pages_fetched, 1);
}

#[tokio::test]
async fn test_robots_disallowed_pages_are_never_fetched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html(
            "Home",
            r#"<a href="/private/page">secret</a> <a href="/public">public</a>"#,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(html_response(html("Public", "hello")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_response(html("Private", "secret")))
        .expect(0)
        .mount(&server)
        .await;

    let engine = http_engine();
    let handle = engine
        .start_crawl(test_job(&format!("{}/", server.uri())))
        .unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.url.contains("/private/")));
    assert_eq!(summary.robots_denied, 1);
}

#[tokio::test]
async fn test_redirect_target_is_not_fetched_twice() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html(
            "Home",
            r#"<a href="/old">old</a> <a href="/new">new</a>"#,
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", base).as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(html_response(html("New", "moved here")))
        .expect(1)
        .mount(&server)
        .await;

    let engine = http_engine();
    let job = CrawlJob {
        workers: 1,
        ..test_job(&format!("{}/", base))
    };
    let handle = engine.start_crawl(job).unwrap();
    engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 2);
    let old = results.iter().find(|r| r.url.ends_with("/old")).unwrap();
    assert_eq!(old.final_url.as_deref(), Some(format!("{}/new", base).as_str()));
    assert_eq!(old.title.as_deref(), Some("New"));
}

#[tokio::test]
async fn test_cancel_before_start_yields_no_results() {
    let fetcher = Arc::new(TreeFetcher::new(2, Duration::ZERO));
    let engine = CrawlEngine::new(fetcher.clone());

    let handle = engine.start_crawl(test_job("http://tree.test/")).unwrap();
    engine.cancel(handle).unwrap();
    let summary = engine.wait(handle).await.unwrap();

    assert_eq!(summary.final_state(), JobState::Cancelled);
    assert_eq!(summary.terminal_reason, TerminalReason::Cancelled);
    assert_eq!(summary.total_pages(), 0);
    assert!(engine.results(handle).unwrap().is_empty());
    assert!(fetcher.page_requests().is_empty());

    // Cancelling a terminal job is a no-op
    engine.cancel(handle).unwrap();
    assert_eq!(engine.status(handle).unwrap().state, JobState::Cancelled);
}

#[tokio::test]
async fn test_cancel_mid_flight_keeps_a_subset() {
    let small_tree = |engine: &CrawlEngine| {
        engine
            .start_crawl(CrawlJob {
                max_depth: 3,
                max_pages: 100,
                workers: 1,
                ..test_job("http://tree.test/")
            })
            .unwrap()
    };

    let full_engine = CrawlEngine::new(Arc::new(TreeFetcher::new(2, Duration::from_millis(10))));
    let full = small_tree(&full_engine);
    full_engine.wait(full).await.unwrap();
    let all_urls = urls(&full_engine.results(full).unwrap());
    assert_eq!(all_urls.len(), 15);

    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(2, Duration::from_millis(10))));
    let handle = small_tree(&engine);
    tokio::time::sleep(Duration::from_millis(45)).await;
    engine.cancel(handle).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(summary.final_state(), JobState::Cancelled);
    assert!(!results.is_empty());
    assert!(results.len() < all_urls.len());
    assert!(urls(&results).is_subset(&all_urls));
    assert_well_formed(&results, 3);
}

#[tokio::test]
async fn test_job_timeout_keeps_partial_results() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(4, Duration::from_millis(20))));
    let job = CrawlJob {
        max_depth: 10,
        max_pages: 10_000,
        workers: 2,
        timeout: Duration::from_millis(150),
        ..test_job("http://tree.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(summary.final_state(), JobState::Failed(FailureReason::Timeout));
    assert_eq!(summary.terminal_reason, TerminalReason::Timeout);
    assert!(!results.is_empty());
    assert!(results.len() < 10_000);
    assert_well_formed(&results, 10);
}

#[tokio::test]
async fn test_results_are_stable_once_terminal() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(2, Duration::from_millis(5))));
    let job = CrawlJob {
        max_depth: 2,
        ..test_job("http://tree.test/")
    };
    let handle = engine.start_crawl(job).unwrap();

    assert!(matches!(
        engine.results(handle),
        Err(SiftError::JobNotFinished(_))
    ));
    assert!(engine.summary(handle).is_err());

    let summary = engine.wait(handle).await.unwrap();
    let first = engine.results(handle).unwrap();
    let second = engine.results(handle).unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.summary(handle).unwrap(), summary);
    assert_eq!(engine.wait(handle).await.unwrap(), summary);
}

#[tokio::test]
async fn test_status_is_observable() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(2, Duration::ZERO)));
    let job = CrawlJob {
        max_depth: 1,
        ..test_job("http://tree.test/")
    };
    let handle = engine.start_crawl(job).unwrap();
    assert_eq!(engine.status(handle).unwrap().state, JobState::Pending);

    let mut updates = engine.subscribe(handle).unwrap();
    let last = *updates
        .wait_for(|status| status.state.is_terminal())
        .await
        .unwrap();

    let summary = engine.summary(handle).unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.pages_fetched, summary.pages_fetched);
    assert_eq!(summary.pages_fetched, 3);
}

#[tokio::test]
async fn test_unknown_handle_is_reported() {
    let engine = CrawlEngine::new(Arc::new(TreeFetcher::new(1, Duration::ZERO)));
    let other = CrawlEngine::new(Arc::new(TreeFetcher::new(1, Duration::ZERO)));
    let handle: JobHandle = other.start_crawl(test_job("http://tree.test/")).unwrap();

    assert!(matches!(
        engine.status(handle),
        Err(SiftError::UnknownJob(id)) if id == handle.id()
    ));
    assert!(engine.cancel(handle).is_err());
    other.wait(handle).await.unwrap();
}

#[tokio::test]
async fn test_jobs_run_independently() {
    let site = [
        ("http://site.test/", html("Root", r#"<a href="/a">a</a>"#)),
        ("http://site.test/a", html("A", "a")),
    ];
    let fetcher = Arc::new(SiteFetcher::new(&site));
    let engine = CrawlEngine::new(fetcher.clone());

    let first = engine.start_crawl(test_job("http://site.test/")).unwrap();
    let second = engine.start_crawl(test_job("http://site.test/")).unwrap();
    assert_ne!(first, second);

    let a = engine.wait(first).await.unwrap();
    let b = engine.wait(second).await.unwrap();
    assert_eq!(a.pages_fetched, 2);
    assert_eq!(b.pages_fetched, 2);
    assert_eq!(engine.jobs_started().len(), 2);

    // Each job fetched every page once on its own
    let page_requests = fetcher
        .requests()
        .into_iter()
        .filter(|u| !u.ends_with("/robots.txt"))
        .count();
    assert_eq!(page_requests, 4);
}

#[tokio::test]
async fn test_unusable_crawl_delay_on_linked_host_is_ignored() {
    let seed_server = MockServer::start().await;
    let other_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_response(html(
            "Home",
            &format!(r#"<a href="{}/page">elsewhere</a>"#, other_server.uri()),
        )))
        .mount(&seed_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 1e20"))
        .mount(&other_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html_response(html("Elsewhere", "linked page")))
        .expect(1)
        .mount(&other_server)
        .await;

    let engine = http_engine();
    let handle = engine
        .start_crawl(test_job(&format!("{}/", seed_server.uri())))
        .unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.status == PageStatus::Fetched));
    let seed = results.iter().find(|r| r.depth == 0).unwrap();
    assert_eq!(seed.title.as_deref(), Some("Home"));
    assert_eq!(seed.links.len(), 1);
    assert_eq!(summary.final_state(), JobState::Completed);
}

#[tokio::test]
async fn test_panicking_page_does_not_stop_the_job() {
    let site = SiteFetcher::new(&[
        (
            "http://site.test/",
            html(
                "Root",
                r#"<a href="/a">a</a> <a href="/b">b</a> <a href="/c">c</a>"#,
            ),
        ),
        ("http://site.test/a", html("A", "a")),
        ("http://site.test/b", html("B", "b")),
        ("http://site.test/c", html("C", "c")),
    ]);
    let fetcher = PanickingFetcher {
        site,
        panic_on: "http://site.test/b".to_string(),
    };
    let engine = CrawlEngine::new(Arc::new(fetcher));
    let job = CrawlJob {
        workers: 3,
        ..test_job("http://site.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 4);
    assert_well_formed(&results, 3);

    let broken = results.iter().find(|r| r.url == "http://site.test/b").unwrap();
    assert_eq!(broken.status, PageStatus::Failed);
    assert!(broken.error.as_deref().unwrap().contains("panicked"));

    for r in results.iter().filter(|r| r.url != "http://site.test/b") {
        assert_eq!(r.status, PageStatus::Fetched, "{}", r.url);
    }
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.final_state(), JobState::Completed);
    assert_eq!(summary.terminal_reason, TerminalReason::FrontierEmpty);
}

#[tokio::test]
async fn test_redirect_onto_visited_page_is_recorded_as_duplicate() {
    let site = SiteFetcher::new(&[
        (
            "http://site.test/",
            html("Root", r#"<a href="/a">a</a> <a href="/b">b</a>"#),
        ),
        ("http://site.test/a", html("A", r#"<a href="/c">c</a>"#)),
        ("http://site.test/c", html("C", "c")),
    ])
    .with_redirect("http://site.test/b", "http://site.test/a");
    let engine = CrawlEngine::new(Arc::new(site));
    let job = CrawlJob {
        workers: 1,
        ..test_job("http://site.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(results.len(), 4);
    let b = results.iter().find(|r| r.url == "http://site.test/b").unwrap();
    assert_eq!(b.status, PageStatus::FilteredOut);
    assert_eq!(b.basis, Some(RelevanceBasis::DuplicateTarget));
    assert_eq!(b.final_url.as_deref(), Some("http://site.test/a"));
    assert!(b.links.is_empty());

    // /c was reached once, through /a
    let c: Vec<_> = results.iter().filter(|r| r.url == "http://site.test/c").collect();
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].parent.as_deref(), Some("http://site.test/a"));
}

#[tokio::test]
async fn test_pages_finishing_after_timeout_skip_image_downloads() {
    let fetcher = Arc::new(SlowImagePageFetcher {
        latency: Duration::from_millis(300),
        requests: Mutex::new(Vec::new()),
    });
    let store = Arc::new(RecordingStore::default());
    let engine = CrawlEngine::new(fetcher.clone()).with_image_store(store.clone());
    let job = CrawlJob {
        download_images: true,
        timeout: Duration::from_millis(100),
        ..test_job("http://gallery.test/")
    };

    let handle = engine.start_crawl(job).unwrap();
    let summary = engine.wait(handle).await.unwrap();
    let results = engine.results(handle).unwrap();

    assert_eq!(summary.terminal_reason, TerminalReason::Timeout);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, PageStatus::Fetched);
    assert_eq!(results[0].images.len(), 1);
    assert!(results[0].images[0].local_path.is_none());
    assert!(store.stored.lock().unwrap().is_empty());
    assert!(!fetcher
        .requests
        .lock()
        .unwrap()
        .iter()
        .any(|u| u.ends_with("/pic.png")));
}
