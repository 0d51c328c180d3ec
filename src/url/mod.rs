//! URL handling module for Gleaner
//!
//! This module provides seed validation, network-location extraction (the
//! crawl's domain scope), blacklist/whitelist filtering and the opt-in
//! normalization applied before deduplication.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{network_location, network_location_of, validate_seed};
pub use filter::UrlFilter;
pub use normalize::normalize_url;

use ::url::Url;

/// Checks whether a URL belongs to the crawl's domain scope
///
/// Scope is exact equality of network locations: `blog.example.com` is out
/// of scope for a crawl of `example.com`, as is a different port.
pub fn in_scope(url: &Url, domain: &str) -> bool {
    network_location(url).as_deref() == Some(domain)
}
