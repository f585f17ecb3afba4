//! URL handling module for Sift
//!
//! This module provides URL normalization (the frontier dedup key), host keys for
//! politeness scheduling, and allow/deny domain filtering for discovered links.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{host_key, host_name};
pub use matcher::matches_pattern;
pub use normalize::{dedup_key, normalize, normalize_url};

use ::url::Url;

/// Allow/deny host lists applied to discovered links before they reach the frontier
///
/// Deny entries take priority. An empty allow list permits every host that is not denied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainPolicy {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl DomainPolicy {
    /// Creates a policy from allow and deny pattern lists
    pub fn new(allow: Vec<String>, deny: Vec<String>) -> Self {
        Self { allow, deny }
    }

    /// Returns true if the URL's host may be crawled under this policy
    pub fn permits(&self, url: &Url) -> bool {
        let Some(host) = host_name(url) else {
            return false;
        };

        if self.deny.iter().any(|pattern| matches_pattern(pattern, &host)) {
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|pattern| matches_pattern(pattern, &host))
    }
}
