//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP session policy with retry, user-agent rotation and proxies
//! - HTML link extraction and page summaries
//! - The breadth-first frontier and visited set
//! - Operator decisions and overall crawl control
//! - Scraping single pages and crawled URL lists

mod controller;
mod frontier;
mod operator;
mod parser;
mod scrape;
mod session;

pub use controller::{
    threshold_for, Controller, CrawlReport, SkipReason, Step, CHECKPOINT_INTERVAL,
    MAX_PAGES_INCREMENT,
};
pub use frontier::Frontier;
pub use operator::{Decision, FixedOperator, Operator, ScriptedOperator, Threshold};
pub use parser::{extract_links, PageSummary};
pub use scrape::{scrape_url, scrape_urls, ScrapeOptions, ScrapeReport, ScrapedPage};
pub use session::{
    select_proxy, select_user_agent, FetchedPage, Session, SessionPolicy, RETRYABLE_STATUSES,
    USER_AGENT_POOL,
};
