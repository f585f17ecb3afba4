//! Crawler module for bounded, parallel page discovery
//!
//! This module contains the core crawling logic, including:
//! - Fetching pages through a pluggable [`Fetcher`]
//! - HTML content and link extraction
//! - The shared frontier with dedup, depth, budget and per-host politeness
//! - The worker pool and the per-job coordinator
//! - [`CrawlEngine`], the entry point for starting and observing jobs

mod coordinator;
mod engine;
mod extractor;
mod fetcher;
mod frontier;
mod images;
mod sink;
mod worker;

pub use coordinator::{Coordinator, JobRecord};
pub use engine::{CrawlEngine, JobHandle};
pub use extractor::{extract, ExtractedPage};
pub use fetcher::{
    build_client_with_agent, build_http_client, FetchedPage, Fetcher, HttpFetcher, ModeFetcher,
    MAX_REDIRECTS,
};
pub use frontier::{Frontier, FrontierEntry, Take};
pub use images::{download_images, image_file_name, DirImageStore, ImageStore};
pub use sink::ResultSink;
pub use worker::{CrawlContext, WorkerPool};
