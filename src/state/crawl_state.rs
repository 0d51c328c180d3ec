use crate::crawler::Frontier;
use chrono::{DateTime, Utc};

/// Everything needed to continue a crawl
///
/// Mutated only by the controller. Checkpoints are snapshots of this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    /// Network location every queued URL belongs to
    pub domain: String,

    /// Pending queue, visited set and discovered list
    pub frontier: Frontier,

    /// Pages successfully visited
    pub page_count: u32,

    /// Page count at which the operator is consulted; raised by `continue`
    pub max_pages: u32,

    /// Last time the state was started, resumed or snapshotted
    pub timestamp: DateTime<Utc>,
}

impl CrawlState {
    /// Creates the state for a new crawl with `seed` as the only queued URL
    pub fn fresh(domain: impl Into<String>, seed: impl Into<String>, max_pages: u32) -> Self {
        Self {
            domain: domain.into(),
            frontier: Frontier::with_seed(seed),
            page_count: 0,
            max_pages,
            timestamp: Utc::now(),
        }
    }

    /// Refreshes the timestamp
    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Visited URLs in visit order
    pub fn discovered(&self) -> &[String] {
        self.frontier.discovered()
    }
}
