//! Scraping single pages and crawled URL lists
//!
//! Each URL is fetched, handed to a [`Converter`] and the result written to
//! the results directory. In a batch, a failing URL is logged and counted;
//! the batch always runs to the end.

use crate::config::Config;
use crate::crawler::parser::PageSummary;
use crate::crawler::session::Session;
use crate::output::{
    ensure_supported, file_timestamp, safe_domain, Converter, OutputFormat, OutputResult,
};
use crate::url::{network_location, validate_seed};
use crate::CrawlError;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Settings for one scrape batch
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub format: OutputFormat,
    pub results_dir: PathBuf,
    pub timeout: Duration,

    /// Pause between consecutive requests
    pub delay: Duration,
}

impl ScrapeOptions {
    pub fn from_config(config: &Config, format: OutputFormat) -> Self {
        Self {
            format,
            results_dir: PathBuf::from(&config.output.results_dir),
            timeout: config.session.timeout(),
            delay: config.crawler.crawl_delay(),
        }
    }
}

/// Counts and files produced by a scrape batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapeReport {
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<PathBuf>,
}

/// A page written by [`scrape_url`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPage {
    pub path: PathBuf,
    pub summary: PageSummary,
}

/// Fetches one page, renders it and writes `{domain}_{ts}.{ext}`
///
/// # Errors
///
/// * `CrawlError::Export` - The converter cannot produce the requested format,
///   or the result could not be written
/// * `CrawlError::InvalidUrl` - `url` lacks a scheme or host
/// * `CrawlError::Fetch` - The request failed after retries
pub async fn scrape_url(
    url: &str,
    session: &Session,
    converter: &dyn Converter,
    options: &ScrapeOptions,
) -> Result<ScrapedPage, CrawlError> {
    ensure_supported(converter, options.format)?;
    let stamp = file_timestamp(Local::now());

    let page = scrape_one(url, None, &stamp, session, converter, options).await?;
    info!(url = %url, path = %page.path.display(), "Scraped page");
    Ok(page)
}

/// Fetches and renders every URL in `urls`
///
/// Files are named `{domain}_{ts}_{nnnn}.{ext}` by position in the list.
///
/// # Errors
///
/// `CrawlError::Export` when the converter cannot produce the requested
/// format; nothing is fetched in that case. Per-URL failures are counted in
/// the report instead.
pub async fn scrape_urls(
    urls: &[String],
    session: &Session,
    converter: &dyn Converter,
    options: &ScrapeOptions,
) -> Result<ScrapeReport, CrawlError> {
    ensure_supported(converter, options.format)?;

    let mut report = ScrapeReport::default();
    let stamp = file_timestamp(Local::now());

    for (index, url) in urls.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(options.delay).await;
        }

        match scrape_one(url, Some(index + 1), &stamp, session, converter, options).await {
            Ok(page) => {
                info!(url = %url, path = %page.path.display(), "Scraped page");
                report.succeeded += 1;
                report.files.push(page.path);
            }
            Err(e) => {
                error!(url = %url, error = %e, "Scrape failed");
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        "Scrape batch finished"
    );
    Ok(report)
}

async fn scrape_one(
    url: &str,
    position: Option<usize>,
    stamp: &str,
    session: &Session,
    converter: &dyn Converter,
    options: &ScrapeOptions,
) -> Result<ScrapedPage, CrawlError> {
    let parsed = validate_seed(url)?;
    let page = session.get(&parsed, options.timeout).await?;

    let rendered = converter.render(&page.body, &parsed, options.format);
    let domain = network_location(&parsed).unwrap_or_else(|| "unknown".to_string());
    let name = match position {
        Some(position) => format!(
            "{}_{}_{:04}.{}",
            safe_domain(&domain),
            stamp,
            position,
            options.format.extension()
        ),
        None => format!(
            "{}_{}.{}",
            safe_domain(&domain),
            stamp,
            options.format.extension()
        ),
    };

    let path = write_result(&options.results_dir, &name, &rendered)?;
    Ok(ScrapedPage {
        path,
        summary: PageSummary::from_html(&page.text()),
    })
}

fn write_result(dir: &Path, name: &str, content: &str) -> OutputResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path)
}
