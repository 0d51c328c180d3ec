use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Main configuration structure for Gleaner
///
/// Every section and field has a default, so an empty file is a valid
/// configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub session: SessionConfig,
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

/// Crawl loop behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Whether robots.txt rules are consulted before each fetch
    pub respect_robots_txt: bool,

    /// Politeness delay between successful fetches (seconds)
    pub crawl_delay: f64,

    /// Page count at which the operator is asked whether to go on
    pub max_pages: u32,

    /// Whether pausing writes a checkpoint
    pub save_crawl_state: bool,

    /// Pause after a failed fetch before the next frontier item (seconds)
    pub error_cooldown: f64,

    /// How long a fetched robots.txt is reused for the same host (seconds, 0 = never)
    pub robots_cache_ttl: u64,

    /// Normalize discovered URLs before deduplication
    pub normalize_urls: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            respect_robots_txt: true,
            crawl_delay: 2.0,
            max_pages: 100,
            save_crawl_state: true,
            error_cooldown: 2.0,
            robots_cache_ttl: 60,
            normalize_urls: false,
        }
    }
}

impl CrawlerConfig {
    pub fn crawl_delay(&self) -> Duration {
        seconds(self.crawl_delay)
    }

    pub fn error_cooldown(&self) -> Duration {
        seconds(self.error_cooldown)
    }

    pub fn robots_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.robots_cache_ttl)
    }
}

/// Outbound HTTP session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Default user-agent, also used to match robots.txt groups
    pub user_agent: String,

    /// Pick a random browser user-agent per session
    pub rotate_user_agents: bool,

    /// Per-request timeout (seconds)
    pub timeout: f64,

    /// Maximum number of retries for transient failures
    pub max_retries: u32,

    /// Base of the exponential backoff between retries (seconds)
    pub backoff_factor: f64,

    /// Route traffic through one of `proxies`
    pub use_proxies: bool,

    /// Proxy URLs, one is picked at random per session
    pub proxies: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: "Gleaner/1.0".to_string(),
            rotate_user_agents: true,
            timeout: 15.0,
            max_retries: 3,
            backoff_factor: 1.0,
            use_proxies: false,
            proxies: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        seconds(self.timeout)
    }

    pub fn backoff_factor(&self) -> Duration {
        seconds(self.backoff_factor)
    }
}

/// Substring patterns restricting which URLs are fetched
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
}

/// Where crawl artifacts are written
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory for crawled URL lists
    pub crawled_dir: String,

    /// Directory for exported URL lists
    pub exports_dir: String,

    /// Directory for scraped page output
    pub results_dir: String,

    /// SQLite file holding checkpoints
    pub checkpoint_database: String,

    /// Formats the discovered URL list is exported in
    pub export_formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            crawled_dir: "Crawled".to_string(),
            exports_dir: "Exports".to_string(),
            results_dir: "Results".to_string(),
            checkpoint_database: "Crawled/checkpoints.db".to_string(),
            export_formats: vec![ExportFormat::Json, ExportFormat::Csv, ExportFormat::Txt],
        }
    }
}

/// Export format for the discovered URL list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
