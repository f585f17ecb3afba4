//! Append-only result collection
use crate::state::{PageResult, PageStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Collects page results in completion order
///
/// Results are only ever appended; nothing is updated or removed.
#[derive(Debug, Default)]
pub struct ResultSink {
    results: Mutex<Vec<PageResult>>,
    accepted: AtomicUsize,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a result and returns the number of accepted pages so far
    pub fn push(&self, result: PageResult) -> usize {
        let accepted = if result.status == PageStatus::Fetched {
            self.accepted.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.accepted.load(Ordering::SeqCst)
        };
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
        accepted
    }

    /// Copies out every result appended so far, in order
    pub fn snapshot(&self) -> Vec<PageResult> {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
