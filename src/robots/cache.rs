//! Robots.txt caching implementation
//!
//! Parsed rule sets are kept per network location and expire after a
//! configurable TTL. A TTL of zero disables caching entirely.

use crate::robots::RobotsRuleSet;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Cached robots.txt rules for a network location
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt rules
    pub rules: RobotsRuleSet,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRuleSet) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the entry is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// Returns the age of the cached entry
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Per-host robots.txt cache
#[derive(Debug, Clone)]
pub struct RobotsCache {
    ttl: Duration,
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    /// Creates a cache whose entries live for `ttl`
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::zero()),
            entries: HashMap::new(),
        }
    }

    /// Whether this cache stores anything at all
    pub fn is_enabled(&self) -> bool {
        self.ttl > Duration::zero()
    }

    /// Returns the fresh rules for a network location, if any
    ///
    /// Stale entries are evicted on lookup.
    pub fn get(&mut self, netloc: &str) -> Option<&RobotsRuleSet> {
        let stale = self.entries.get(netloc)?.is_stale(self.ttl);
        if stale {
            self.entries.remove(netloc);
            return None;
        }
        self.entries.get(netloc).map(|cached| &cached.rules)
    }

    /// Stores rules for a network location
    pub fn insert(&mut self, netloc: &str, rules: RobotsRuleSet) {
        if self.is_enabled() {
            self.entries
                .insert(netloc.to_string(), CachedRobots::new(rules));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
