//! JSON export of page results
use crate::state::{CrawlSummary, PageResult};
use crate::SiftError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct Export<'a> {
    summary: &'a CrawlSummary,
    results: &'a [PageResult],
}

/// Writes a job's summary and results to `path` as pretty-printed JSON
pub fn write_results_json(
    path: &Path,
    summary: &CrawlSummary,
    results: &[PageResult],
) -> Result<(), SiftError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &Export { summary, results })?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::info!("Wrote {} results to {}", results.len(), path.display());
    Ok(())
}
