//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! Every failure to obtain rules degrades open: the URL is allowed and the
//! failure is logged.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache};
pub use parser::RobotsRuleSet;

use crate::config::Config;
use crate::crawler::Session;
use crate::url::network_location;
use crate::{CrawlError, FetchError};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Timeout for robots.txt requests, independent of the page timeout
pub const ROBOTS_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches and parses robots.txt for the host of `url`
///
/// A non-200 response yields an allow-all rule set.
///
/// # Errors
///
/// Returns `CrawlError::RobotsFetch` when the request itself fails.
pub async fn fetch_robots(
    url: &Url,
    user_agent: &str,
    session: &Session,
) -> Result<RobotsRuleSet, CrawlError> {
    let robots_url = url.join("/robots.txt").map_err(|e| CrawlError::RobotsFetch {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match session.get(&robots_url, ROBOTS_TIMEOUT).await {
        Ok(page) if page.status == 200 => {
            Ok(RobotsRuleSet::parse(&page.text(), user_agent))
        }
        Ok(page) => {
            debug!(url = %robots_url, status = page.status, "No usable robots.txt");
            Ok(RobotsRuleSet::allow_all())
        }
        Err(FetchError::Status { status, .. }) => {
            debug!(url = %robots_url, status, "No robots.txt");
            Ok(RobotsRuleSet::allow_all())
        }
        Err(e) => Err(CrawlError::RobotsFetch {
            url: robots_url.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Answers allow/disallow for URLs, fetching robots.txt per host as needed
#[derive(Debug)]
pub struct RobotsChecker {
    enabled: bool,
    user_agent: String,
    cache: RobotsCache,
}

impl RobotsChecker {
    /// Creates a checker
    ///
    /// # Arguments
    ///
    /// * `enabled` - When false, every URL is allowed and nothing is fetched
    /// * `user_agent` - The agent string matched against `User-agent` groups
    /// * `cache_ttl` - How long rules are reused per host (zero re-fetches every time)
    pub fn new(enabled: bool, user_agent: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            enabled,
            user_agent: user_agent.into(),
            cache: RobotsCache::new(cache_ttl),
        }
    }

    /// Creates a checker using the configured (not rotated) user-agent
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.crawler.respect_robots_txt,
            config.session.user_agent.clone(),
            config.crawler.robots_cache_ttl(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Checks whether `url` may be fetched
    pub async fn is_allowed(&mut self, url: &Url, session: &Session) -> bool {
        if !self.enabled {
            return true;
        }

        let allowed = self.rules_for(url, session).await.is_allowed(url.path());
        if !allowed {
            warn!(url = %url, "Disallowed by robots.txt");
        }
        allowed
    }

    /// Returns the rules for the host of `url`, from cache when fresh
    pub async fn rules_for(&mut self, url: &Url, session: &Session) -> RobotsRuleSet {
        let netloc = network_location(url).unwrap_or_default();

        if let Some(rules) = self.cache.get(&netloc) {
            return rules.clone();
        }

        let rules = match fetch_robots(url, &self.user_agent, session).await {
            Ok(rules) => rules,
            Err(e) => {
                error!(error = %e, "Robots.txt unavailable, allowing");
                RobotsRuleSet::allow_all()
            }
        };

        self.cache.insert(&netloc, rules.clone());
        rules
    }
}
