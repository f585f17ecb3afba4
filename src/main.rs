//! Sift main entry point
//!
//! This is the command-line interface for the Sift crawl engine.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sift_crawler::config::{load_config_with_hash, Config, ImagesConfig, HTTP_SCORER_BACKEND};
use sift_crawler::crawler::{build_http_client, DirImageStore, HttpFetcher};
use sift_crawler::filter::HttpScorer;
use sift_crawler::output::{print_statistics, write_results_json, CrawlStatistics};
use sift_crawler::{CrawlEngine, CrawlJob};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Sift: a bounded, polite, relevance-filtering web crawler
///
/// Sift crawls outward from a seed URL up to a depth and page budget, respects
/// robots.txt and per-host delays, and keeps only pages matching the configured
/// keywords or relevance scorer.
#[derive(Parser, Debug)]
#[command(name = "sift-crawler")]
#[command(version)]
#[command(about = "A bounded, polite, relevance-filtering web crawler", long_about = None)]
struct Cli {
    /// URL the crawl starts from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth from the seed
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    depth: Option<i32>,

    /// Maximum number of pages to process
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Keep only pages containing a keyword (repeatable)
    #[arg(short, long = "keyword", value_name = "K")]
    keywords: Vec<String>,

    /// Number of concurrent workers
    #[arg(short, long, value_name = "N")]
    workers: Option<usize>,

    /// Request JavaScript-rendered fetching
    #[arg(long)]
    dynamic: bool,

    /// Download images of accepted pages into this directory
    #[arg(long, value_name = "DIR")]
    images_dir: Option<PathBuf>,

    /// Write the summary and results as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.images_dir {
        config.images = Some(ImagesConfig {
            directory: dir.to_string_lossy().into_owned(),
        });
    }

    let job = build_job(&cli, &config);

    let engine = build_engine(&config)?;
    run_job(&engine, job, cli.output.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sift_crawler=info,warn"),
            1 => EnvFilter::new("sift_crawler=debug,info"),
            2 => EnvFilter::new("sift_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Merges command-line overrides into the job described by the config file
fn build_job(cli: &Cli, config: &Config) -> CrawlJob {
    let mut job = config.to_job(&cli.seed);

    if let Some(depth) = cli.depth {
        job.max_depth = depth;
    }
    if let Some(max_pages) = cli.max_pages {
        job.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        job.workers = workers;
    }
    if !cli.keywords.is_empty() {
        job.keywords = cli.keywords.clone();
    }
    job.use_dynamic_fetch |= cli.dynamic;
    job.download_images = config.images.is_some();

    job
}

/// Builds an engine with the HTTP fetcher and whatever backends the config enables
fn build_engine(config: &Config) -> anyhow::Result<CrawlEngine> {
    let client =
        build_http_client(&config.user_agent).context("failed to build HTTP client")?;
    let mut engine = CrawlEngine::new(Arc::new(HttpFetcher::new(client.clone())));

    if let Some(scorer) = &config.scorer {
        let endpoint = Url::parse(&scorer.endpoint)
            .with_context(|| format!("invalid scorer endpoint {}", scorer.endpoint))?;
        tracing::info!("Scoring pages with {}", endpoint);
        engine = engine.with_scorer(
            HTTP_SCORER_BACKEND,
            Arc::new(HttpScorer::new(client, endpoint)),
        );
    }

    if let Some(images) = &config.images {
        tracing::info!("Storing images in {}", images.directory);
        engine = engine.with_image_store(Arc::new(DirImageStore::new(&images.directory)));
    }

    Ok(engine)
}

/// Runs one job to completion, cancelling it on ctrl-c, and reports the outcome
async fn run_job(
    engine: &CrawlEngine,
    job: CrawlJob,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} (depth {}, up to {} pages, {} keywords)",
        job.seed_url,
        job.max_depth,
        job.max_pages,
        job.keywords.len()
    );

    let handle = engine.start_crawl(job).context("invalid crawl settings")?;

    let summary = tokio::select! {
        summary = engine.wait(handle) => summary?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling job {}", handle);
            engine.cancel(handle)?;
            engine.wait(handle).await?
        }
    };

    let results = engine.results(handle)?;
    print_statistics(&summary, &CrawlStatistics::from_results(&results));

    if let Some(path) = output {
        write_results_json(path, &summary, &results)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\n✓ Results written to: {}", path.display());
    }

    Ok(())
}
