//! HTML content extraction
//!
//! Pulls the title, visible text, outbound links, images and `<meta>` pairs out of a fetched
//! page. Output is deterministic for identical input: links and images keep document order
//! with duplicates removed.

use crate::state::PageImage;
use crate::url::normalize_url;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Elements whose text is never part of the page text
const SKIPPED_TAGS: [&str; 5] = ["script", "style", "noscript", "iframe", "template"];

/// Content extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Visible text, one trimmed text node per line
    pub text: String,

    /// Absolute, normalized HTTP(S) links in document order
    pub links: Vec<Url>,

    pub images: Vec<PageImage>,

    pub metadata: BTreeMap<String, String>,
}

impl ExtractedPage {
    /// The image handed to relevance scorers
    pub fn representative_image(&self) -> Option<&PageImage> {
        self.images.first()
    }
}

/// Parses HTML content and extracts everything the crawler needs
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links, data URIs and fragment-only anchors
/// - Anything that is not HTTP(S) after resolution
///
/// # Example
///
/// ```
/// use sift_crawler::crawler::extract;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#top">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = extract(html, &base_url);
/// assert_eq!(page.title, Some("Test".to_string()));
/// assert_eq!(page.links[0].as_str(), "https://example.com/page");
/// ```
pub fn extract(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        title: extract_title(&document),
        text: extract_text(&document),
        links: extract_links(&document, base_url),
        images: extract_images(&document, base_url),
        metadata: extract_metadata(&document),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_text(document: &Html) -> String {
    let mut lines = Vec::new();
    collect_text(document.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
            }
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, lines);
                }
            }
            _ => {}
        }
    }
}

/// Extracts all followable links, deduplicated by their normalized form
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.to_string()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<PageImage> {
    let Ok(img_selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for element in document.select(&img_selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Some(url) = resolve_image(src, base_url) else {
            continue;
        };
        if !seen.insert(url.to_string()) {
            continue;
        }

        let attr = |name: &str| {
            element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        images.push(PageImage {
            url: url.to_string(),
            alt: attr("alt"),
            title: attr("title"),
            local_path: None,
        });
    }

    images
}

/// Collects `<meta name|property="..." content="...">` pairs; later duplicates win
fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let Ok(meta_selector) = Selector::parse("meta[content]") else {
        return metadata;
    };

    for element in document.select(&meta_selector) {
        let value = element.value();
        let key = value.attr("name").or_else(|| value.attr("property"));
        if let (Some(key), Some(content)) = (key, value.attr("content")) {
            let key = key.trim();
            if !key.is_empty() {
                metadata.insert(key.to_string(), content.trim().to_string());
            }
        }
    }

    metadata
}

fn is_skipped_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
}

/// Resolves a link href to a normalized absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if is_skipped_href(href) {
        return None;
    }
    normalize_url(href, Some(base_url)).ok()
}

/// Resolves an image source; image URLs keep their path verbatim
fn resolve_image(src: &str, base_url: &Url) -> Option<Url> {
    let src = src.trim();
    if is_skipped_href(src) {
        return None;
    }
    let mut url = base_url.join(src).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}
