//! Crawl frontier and visited-set deduplication
//!
//! The frontier is a plain FIFO queue, so pages are visited breadth-first.
//! A URL may sit in the queue more than once before its first visit; the
//! visited guard at dequeue time makes the extra copies harmless.

use crate::CrawlError;
use std::collections::{HashSet, VecDeque};

/// Pending URLs plus the set and ordered list of visited URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    queue: VecDeque<String>,
    visited: HashSet<String>,
    discovered: Vec<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier holding only `seed`
    pub fn with_seed(seed: impl Into<String>) -> Self {
        let mut frontier = Self::new();
        frontier.queue.push_back(seed.into());
        frontier
    }

    /// Rebuilds a frontier from checkpointed parts
    ///
    /// Visited URLs missing from `discovered` are appended to it so that the
    /// visited set stays a subset of the discovered list.
    pub fn restore(
        visited: impl IntoIterator<Item = String>,
        pending: impl IntoIterator<Item = String>,
        discovered: Vec<String>,
    ) -> Self {
        let mut frontier = Self {
            queue: pending.into_iter().collect(),
            visited: discovered.iter().cloned().collect(),
            discovered,
        };

        for url in visited {
            if frontier.visited.insert(url.clone()) {
                frontier.discovered.push(url);
            }
        }

        frontier
    }

    /// Appends `url` to the tail of the queue unless it was already visited
    ///
    /// Returns whether the URL was queued. URLs already waiting in the queue
    /// are queued again.
    pub fn enqueue_if_new(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.visited.contains(&url) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Pops the head of the queue
    ///
    /// # Errors
    ///
    /// `CrawlError::EmptyFrontier` when nothing is left, the normal end of a crawl.
    pub fn dequeue(&mut self) -> Result<String, CrawlError> {
        self.queue.pop_front().ok_or(CrawlError::EmptyFrontier)
    }

    /// Records a successful visit
    ///
    /// Returns false, and changes nothing, if the URL was already visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        if !self.visited.insert(url.to_string()) {
            return false;
        }
        self.discovered.push(url.to_string());
        true
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Queued URLs, head first
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.queue.iter().map(String::as_str)
    }

    /// Visited URLs in visit order
    pub fn discovered(&self) -> &[String] {
        &self.discovered
    }

    /// Visited URLs, sorted
    pub fn visited_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.visited.iter().cloned().collect();
        urls.sort();
        urls
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Number of queued entries, duplicates included
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
