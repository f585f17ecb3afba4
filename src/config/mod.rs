//! Configuration module for Sift
//!
//! `CrawlJob` is the engine's only input. The TOML file types exist for the command line,
//! which turns a loaded `Config` into a job with [`Config::to_job`].
//!
//! # Example
//!
//! ```no_run
//! use sift_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sift.toml")).unwrap();
//! let job = config.to_job("https://example.com/");
//! println!("Crawler will use max depth: {}", job.max_depth);
//! ```

mod job;
mod parser;
mod types;
mod validation;

pub use job::{
    CrawlJob, ScoringSettings, DEFAULT_DELAY, DEFAULT_FETCH_TIMEOUT, DEFAULT_JOB_TIMEOUT,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_ROBOTS_TTL, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
};

pub use types::{
    Config, CrawlerConfig, FilterConfig, ImagesConfig, ScorerConfig, UserAgentConfig,
    HTTP_SCORER_BACKEND,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::{validate_job, MAX_WORKERS};
