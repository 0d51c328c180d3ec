//! Gleaner: a polite single-domain web crawler
//!
//! This crate crawls one site breadth-first from a seed URL, respecting
//! robots.txt, a politeness delay and bounded retries, and checkpoints its
//! state so a crawl can be paused and resumed across process restarts.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Gleaner operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to fetch robots.txt from {url}: {message}")]
    RobotsFetch { url: String, message: String },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("Failed to write checkpoint: {0}")]
    CheckpointWrite(String),

    #[error("Failed to read checkpoint: {0}")]
    CheckpointRead(String),

    #[error("Checkpoint {id} is corrupt: {message}")]
    CorruptCheckpoint { id: i64, message: String },

    #[error("Checkpoint {0} not found")]
    CheckpointNotFound(i64),

    #[error("Frontier is empty")]
    EmptyFrontier,

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Export error: {0}")]
    Export(#[from] output::OutputError),

    #[error("Invalid crawl transition: {from} -> {to}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("URL has no scheme: {0}")]
    MissingScheme(String),

    #[error("URL has no network location: {0}")]
    MissingHost(String),
}

/// Errors produced by an outbound request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns the HTTP status code, if the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for Gleaner operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Controller, CrawlReport, Decision, Operator, Threshold};
pub use state::{CrawlPhase, CrawlState};
pub use url::{network_location, validate_seed, UrlFilter};
