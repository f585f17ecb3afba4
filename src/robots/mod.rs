//! Robots.txt handling module
//!
//! Parsing, TTL-bounded caching and the per-job [`RobotsGate`]. Only Allow/Disallow and
//! Crawl-delay are honored.

mod cache;
mod gate;
mod parser;

pub use cache::CachedRobots;
pub use gate::RobotsGate;
pub use parser::{agent_token, ParsedRobots, MAX_CRAWL_DELAY};
