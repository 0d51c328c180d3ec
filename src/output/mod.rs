//! Output module for crawl artifacts
//!
//! This module handles:
//! - Writing and reading crawled URL lists
//! - Exporting the discovered URLs as json, csv or txt
//! - The converter port used when scraping pages
//! - Searching scraped results and exporting the matches

mod convert;
mod crawled;
mod export;
mod search;
mod traits;

pub use convert::RawHtmlConverter;
pub use crawled::{
    file_timestamp, list_crawled_files, read_crawled_urls, safe_domain, save_crawled_urls,
};
pub use export::{export_all, export_urls};
pub use search::{
    export_search_results, search_results, searchable_files, snippet_around, SearchHit,
    SNIPPET_CONTEXT,
};
pub use traits::{ensure_supported, Converter, OutputError, OutputFormat, OutputResult};

use crate::config::OutputConfig;
use std::path::{Path, PathBuf};

/// Files produced when a crawl is finalized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizedOutput {
    pub crawled_file: Option<PathBuf>,
    pub exports: Vec<PathBuf>,
}

/// Persists and exports a finished crawl's discovered URLs
///
/// Failures are logged; whatever was written is returned.
pub fn finalize_crawl(config: &OutputConfig, domain: &str, urls: &[String]) -> FinalizedOutput {
    let crawled_file = match save_crawled_urls(Path::new(&config.crawled_dir), domain, urls) {
        Ok(path) => {
            tracing::info!(path = %path.display(), urls = urls.len(), "Crawled URLs saved");
            Some(path)
        }
        Err(e) => {
            tracing::error!(domain, error = %e, "Failed to save crawled URLs");
            None
        }
    };

    let exports = export_all(
        Path::new(&config.exports_dir),
        domain,
        urls,
        &config.export_formats,
    );

    FinalizedOutput {
        crawled_file,
        exports,
    }
}
