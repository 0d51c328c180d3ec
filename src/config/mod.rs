//! Configuration module for Gleaner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The loaded [`Config`] is an immutable value handed to each component at
//! construction; editing settings means reloading and rebuilding.
//!
//! # Example
//!
//! ```no_run
//! use gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("settings.toml")).unwrap();
//! println!("Crawl delay: {}s", config.crawler.crawl_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExportFormat, FilterConfig, OutputConfig, SessionConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_or_create_config, parse_config,
};
pub use validation::validate;
