//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the domain, frontier and counters of one crawl
//! - `CrawlPhase`: where the controller is in its lifecycle

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::CrawlPhase;
